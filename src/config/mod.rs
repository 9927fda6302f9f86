//! Configuration module for TutorTalk.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each provider
//! and backend, `AppPaths` for cross-platform data directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, DatabaseConfig, GenerationConfig, LlmConfig, StorageBackend, StorageConfig,
    TtsConfig,
};
