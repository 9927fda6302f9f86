//! Module generation pipeline.
//!
//! This module wires LLM content generation, relational persistence and
//! best-effort narration into one call, and exposes the stage of a run
//! to whoever is watching.
//!
//! # Architecture
//!
//! ```text
//! ModuleGenerator::generate_module(title, language)
//!        │
//!        ├─ ContentGenerator   ── LlmClient (structured output) → GeneratedLesson
//!        │
//!        ├─ ModulePersister    ── ModuleStore: module → (section → quiz) × 5
//!        │                        any failure → delete_module (cascade)
//!        │
//!        ├─ AudioSynthesizer   ── SpeechSynthesizer → ObjectStorage, ≤ N in flight
//!        │                        → AudioOutcomes (one entry per section)
//!        │
//!        └─ write_back + re-read sections → ModuleBundle
//!
//! GenerationStage (watch channel) ←── updated at every step
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tutor_talk::config::AppConfig;
//! use tutor_talk::llm::OpenAiClient;
//! use tutor_talk::pipeline::{AudioSynthesizer, ModuleGenerator};
//! use tutor_talk::storage::LocalStorage;
//! use tutor_talk::store::SqliteStore;
//! use tutor_talk::tts::ElevenLabsClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let store = Arc::new(SqliteStore::open(&config.database_path())?);
//!     let audio = AudioSynthesizer::new(
//!         Arc::new(ElevenLabsClient::from_config(&config.tts)),
//!         Arc::new(LocalStorage::new(config.storage_dir())),
//!     )
//!     .with_concurrency(config.generation.audio_concurrency());
//!
//!     let generator = ModuleGenerator::new(Arc::new(OpenAiClient::from_config(&config.llm)), store)
//!         .configured(&config)
//!         .with_audio(audio);
//!
//!     let bundle = generator.generate_module("Photosynthesis Basics", None).await?;
//!     println!("{} sections", bundle.sections.len());
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod persist;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use audio::{write_back, AudioOutcome, AudioOutcomes, AudioSynthesizer};
pub use error::{AudioError, GenerationError, PersistStage, PersistenceError, PipelineError};
pub use generator::ContentGenerator;
pub use orchestrator::ModuleGenerator;
pub use persist::ModulePersister;
pub use state::{stage_channel, GenerationStage, StageReceiver, StageSender};
