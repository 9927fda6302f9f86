//! Error taxonomy for the generation pipeline.
//!
//! Only [`GenerationError`] and [`PersistenceError`] can fail a run; they are
//! wrapped in [`PipelineError`], which carries the short caller-facing
//! message and a diagnostic details string. [`AudioError`] is recorded per
//! section and never escapes the audio stage.

use std::fmt;

use thiserror::Error;

use crate::llm::LlmError;
use crate::storage::StorageError;
use crate::store::StoreError;
use crate::tts::TtsError;

// ---------------------------------------------------------------------------
// GenerationError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    /// The reply did not deserialize into, or did not satisfy the shape of,
    /// a generated lesson.
    #[error("generated lesson is invalid: {0}")]
    InvalidLesson(String),
}

// ---------------------------------------------------------------------------
// PersistenceError
// ---------------------------------------------------------------------------

/// The write that failed while persisting a generated module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStage {
    Module,
    Section,
    Quiz,
}

impl PersistStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistStage::Module => "module",
            PersistStage::Section => "section",
            PersistStage::Quiz => "quiz",
        }
    }
}

impl fmt::Display for PersistStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Failed to create {stage}: {source}")]
pub struct PersistenceError {
    pub stage: PersistStage,
    #[source]
    pub source: StoreError,
}

impl PersistenceError {
    pub fn new(stage: PersistStage, source: StoreError) -> Self {
        Self { stage, source }
    }

    /// `"Failed to create module"`, `"... section"` or `"... quiz"`.
    pub fn message(&self) -> String {
        format!("Failed to create {}", self.stage)
    }
}

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("speech synthesis failed: {0}")]
    Synthesis(#[from] TtsError),

    #[error("audio upload failed: {0}")]
    Upload(#[from] StorageError),
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Top-level failure of [`ModuleGenerator::generate_module`].
///
/// [`ModuleGenerator::generate_module`]: super::ModuleGenerator::generate_module
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Module generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("{0}")]
    Persistence(#[from] PersistenceError),
}

impl PipelineError {
    /// Short message shown to the caller.
    pub fn message(&self) -> String {
        match self {
            PipelineError::Generation(_) => "Module generation failed".to_string(),
            PipelineError::Persistence(e) => e.message(),
        }
    }

    /// Low-level diagnostic string.
    pub fn details(&self) -> String {
        match self {
            PipelineError::Generation(e) => e.to_string(),
            PipelineError::Persistence(e) => e.source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_message_names_the_stage() {
        let err = PipelineError::from(PersistenceError::new(
            PersistStage::Section,
            StoreError::Backend("disk full".into()),
        ));
        assert_eq!(err.message(), "Failed to create section");
        assert_eq!(err.details(), "storage backend error: disk full");
    }

    #[test]
    fn generation_message_is_fixed() {
        let err = PipelineError::from(GenerationError::Llm(LlmError::EmptyResponse));
        assert_eq!(err.message(), "Module generation failed");
        assert!(err.details().contains("No content in LLM response"));
    }
}
