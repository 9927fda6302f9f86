//! Generation stage reporting.
//!
//! [`GenerationStage`] is the coarse state of one `generate_module` run.
//! The orchestrator publishes it on an optional `tokio::sync::watch`
//! channel so a front end (the CLI spinner, a request handler) can show
//! where a run currently is without polling the store.

use tokio::sync::watch;

// ---------------------------------------------------------------------------
// GenerationStage
// ---------------------------------------------------------------------------

/// Stages of a module generation run.
///
/// ```text
/// Idle ──start──▶ Generating ──lesson parsed──▶ Persisting
///                     │                            │
///                     └──error──▶ Failed ◀──error──┘
///                                                  │
///                                   rows written ──▶ Synthesizing ──▶ Done
///                                   (audio disabled) ───────────────▶ Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationStage {
    #[default]
    Idle,

    /// Waiting on the LLM for the lesson tree.
    Generating,

    /// Writing module, sections and quizzes.
    Persisting,

    /// Best-effort narration and upload.
    Synthesizing,

    Done,

    Failed,
}

impl GenerationStage {
    /// `true` while a run is in flight.
    ///
    /// ```
    /// use tutor_talk::pipeline::GenerationStage;
    ///
    /// assert!(!GenerationStage::Idle.is_busy());
    /// assert!(GenerationStage::Generating.is_busy());
    /// assert!(GenerationStage::Synthesizing.is_busy());
    /// assert!(!GenerationStage::Done.is_busy());
    /// assert!(!GenerationStage::Failed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            GenerationStage::Generating | GenerationStage::Persisting | GenerationStage::Synthesizing
        )
    }

    /// Short label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            GenerationStage::Idle => "Idle",
            GenerationStage::Generating => "Writing lesson",
            GenerationStage::Persisting => "Saving",
            GenerationStage::Synthesizing => "Recording audio",
            GenerationStage::Done => "Done",
            GenerationStage::Failed => "Failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Channel helpers
// ---------------------------------------------------------------------------

pub type StageSender = watch::Sender<GenerationStage>;
pub type StageReceiver = watch::Receiver<GenerationStage>;

/// Create a stage channel starting at [`GenerationStage::Idle`].
pub fn stage_channel() -> (StageSender, StageReceiver) {
    watch::channel(GenerationStage::Idle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(GenerationStage::default(), GenerationStage::Idle);
    }

    #[test]
    fn labels_are_distinct() {
        let all = [
            GenerationStage::Idle,
            GenerationStage::Generating,
            GenerationStage::Persisting,
            GenerationStage::Synthesizing,
            GenerationStage::Done,
            GenerationStage::Failed,
        ];
        let mut labels: Vec<&str> = all.iter().map(|s| s.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), all.len());
    }

    #[tokio::test]
    async fn channel_carries_latest_stage() {
        let (tx, mut rx) = stage_channel();
        tx.send_replace(GenerationStage::Persisting);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), GenerationStage::Persisting);
    }
}
