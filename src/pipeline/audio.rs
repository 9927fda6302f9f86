//! Best-effort narration of persisted sections.
//!
//! Every section is spoken with the voice chosen for the module language,
//! uploaded to `audio/{module_id}/{section_id}.mp3`, and reported in a map
//! that has one entry per input section. Failures are recorded, logged and
//! otherwise ignored. At most `concurrency` sections are in flight at once.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::model::Section;
use crate::storage::{audio_object_path, ObjectStorage, AUDIO_CONTENT_TYPE};
use crate::store::ModuleStore;
use crate::tts::{voice_for_language, SpeechSynthesizer, VoiceConfig};

use super::error::AudioError;

/// What happened to one section.
#[derive(Debug, Clone)]
pub enum AudioOutcome {
    Ready { audio_url: String },
    Failed { error: AudioError },
}

impl AudioOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, AudioOutcome::Ready { .. })
    }

    pub fn audio_url(&self) -> Option<&str> {
        match self {
            AudioOutcome::Ready { audio_url } => Some(audio_url),
            AudioOutcome::Failed { .. } => None,
        }
    }
}

/// Section id → outcome, total over the sections that were submitted.
pub type AudioOutcomes = HashMap<String, AudioOutcome>;

pub struct AudioSynthesizer {
    tts: Arc<dyn SpeechSynthesizer>,
    storage: Arc<dyn ObjectStorage>,
    concurrency: usize,
}

impl AudioSynthesizer {
    pub fn new(tts: Arc<dyn SpeechSynthesizer>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            tts,
            storage,
            concurrency: 1,
        }
    }

    /// Allow up to `n` sections in flight; `0` is treated as `1`.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub async fn synthesize(
        &self,
        module_id: &str,
        sections: &[Section],
        language: &str,
    ) -> AudioOutcomes {
        let voice = voice_for_language(language);
        log::debug!(
            "audio: {} sections for module {module_id} with voice {} (concurrency {})",
            sections.len(),
            voice.name,
            self.concurrency
        );

        stream::iter(sections)
            .map(|section| async move {
                let outcome = match self.narrate(module_id, section, &voice).await {
                    Ok(audio_url) => AudioOutcome::Ready { audio_url },
                    Err(error) => {
                        log::warn!("audio: section {} failed: {error}", section.id);
                        AudioOutcome::Failed { error }
                    }
                };
                (section.id.clone(), outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn narrate(
        &self,
        module_id: &str,
        section: &Section,
        voice: &VoiceConfig,
    ) -> Result<String, AudioError> {
        let audio = self.tts.synthesize(&section.content, voice).await?;
        let path = audio_object_path(module_id, &section.id);
        let url = self
            .storage
            .upload(&path, audio, AUDIO_CONTENT_TYPE)
            .await?;
        Ok(url)
    }
}

/// Patch `audio_url` on every section with a `Ready` outcome.
///
/// Failed sections are left untouched. A patch that fails (for instance
/// because the module was deleted meanwhile) is logged and skipped.
/// Returns the number of rows updated.
pub async fn write_back(store: &dyn ModuleStore, outcomes: &AudioOutcomes) -> usize {
    let mut patched = 0;
    for (section_id, outcome) in outcomes {
        let Some(url) = outcome.audio_url() else {
            continue;
        };
        match store.set_section_audio_url(section_id, url).await {
            Ok(()) => patched += 1,
            Err(e) => log::warn!("audio: could not save url for section {section_id}: {e}"),
        }
    }
    patched
}
