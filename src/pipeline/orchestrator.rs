//! End-to-end module generation.
//!
//! # Flow
//!
//! ```text
//! generate_module(title, language)
//!   ├─ ContentGenerator::generate        [Generating]   error → PipelineError::Generation
//!   ├─ ModulePersister::persist          [Persisting]   error → PipelineError::Persistence
//!   ├─ AudioSynthesizer::synthesize      [Synthesizing] best effort, never fails the run
//!   │    └─ write_back(outcomes)
//!   └─ re-read sections from the store   [Done]
//! ```

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::prompt::DEFAULT_LANGUAGE;
use crate::llm::LlmClient;
use crate::model::ModuleBundle;
use crate::store::ModuleStore;

use super::audio::{write_back, AudioOutcomes, AudioSynthesizer};
use super::error::PipelineError;
use super::generator::ContentGenerator;
use super::persist::ModulePersister;
use super::state::{GenerationStage, StageSender};

/// Drives one module from title to persisted, narrated bundle.
pub struct ModuleGenerator {
    generator: ContentGenerator,
    persister: ModulePersister,
    audio: Option<AudioSynthesizer>,
    store: Arc<dyn ModuleStore>,
    default_language: String,
    stage: Option<StageSender>,
}

impl ModuleGenerator {
    /// Build a generator without audio; add it with [`with_audio`](Self::with_audio).
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn ModuleStore>) -> Self {
        Self {
            generator: ContentGenerator::new(llm),
            persister: ModulePersister::new(Arc::clone(&store)),
            audio: None,
            store,
            default_language: DEFAULT_LANGUAGE.to_string(),
            stage: None,
        }
    }

    /// Apply the `[generation]` settings that are not collaborators.
    pub fn configured(mut self, config: &AppConfig) -> Self {
        let generation = &config.generation;
        self.persister = self
            .persister
            .with_estimated_duration(generation.estimated_duration_mins);
        if !generation.default_language.trim().is_empty() {
            self.default_language = generation.default_language.trim().to_string();
        }
        self
    }

    pub fn with_audio(mut self, audio: AudioSynthesizer) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Publish stage changes on `sender`.
    pub fn with_stage_updates(mut self, sender: StageSender) -> Self {
        self.stage = Some(sender);
        self
    }

    fn set_stage(&self, stage: GenerationStage) {
        if let Some(tx) = &self.stage {
            tx.send_replace(stage);
        }
    }

    /// Generate, persist and narrate a module.
    ///
    /// `language` falls back to the configured default when absent or blank.
    /// Audio problems never fail the call; the returned sections carry an
    /// `audio_url` exactly where narration and write-back succeeded.
    pub async fn generate_module(
        &self,
        title: &str,
        language: Option<&str>,
    ) -> Result<ModuleBundle, PipelineError> {
        let title = title.trim();
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.default_language.as_str())
            .to_string();

        // ── 1. Content ───────────────────────────────────────────────────
        self.set_stage(GenerationStage::Generating);
        let lesson = match self.generator.generate(title, &language).await {
            Ok(lesson) => lesson,
            Err(e) => {
                log::error!("pipeline: generation of {title:?} failed: {e}");
                self.set_stage(GenerationStage::Failed);
                return Err(e.into());
            }
        };

        // ── 2. Rows ──────────────────────────────────────────────────────
        self.set_stage(GenerationStage::Persisting);
        let mut bundle = match self.persister.persist(title, &language, &lesson).await {
            Ok(bundle) => bundle,
            Err(e) => {
                self.set_stage(GenerationStage::Failed);
                return Err(e.into());
            }
        };

        // ── 3. Audio (best effort) ───────────────────────────────────────
        let Some(audio) = &self.audio else {
            log::info!("pipeline: audio disabled, module {} ready", bundle.module.id);
            self.set_stage(GenerationStage::Done);
            return Ok(bundle);
        };

        self.set_stage(GenerationStage::Synthesizing);
        let outcomes = audio
            .synthesize(&bundle.module.id, &bundle.sections, &language)
            .await;
        let patched = write_back(self.store.as_ref(), &outcomes).await;
        log::info!(
            "pipeline: module {} ready, {patched}/{} sections narrated",
            bundle.module.id,
            bundle.sections.len()
        );

        // ── 4. Refresh ───────────────────────────────────────────────────
        match self.store.sections_for_module(&bundle.module.id).await {
            Ok(sections) if !sections.is_empty() => bundle.sections = sections,
            Ok(_) => log::warn!(
                "pipeline: module {} has no sections on re-read, keeping written copy",
                bundle.module.id
            ),
            Err(e) => {
                log::warn!("pipeline: section re-read failed ({e}), applying outcomes locally");
                apply_outcomes(&mut bundle, &outcomes);
            }
        }

        self.set_stage(GenerationStage::Done);
        Ok(bundle)
    }
}

fn apply_outcomes(bundle: &mut ModuleBundle, outcomes: &AudioOutcomes) {
    for section in &mut bundle.sections {
        if let Some(url) = outcomes.get(&section.id).and_then(|o| o.audio_url()) {
            section.audio_url = Some(url.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
