//! Core `SpeechSynthesizer` trait and `ElevenLabsClient` implementation.
//!
//! The provider answers with a streamed MPEG body; [`ElevenLabsClient`]
//! drains the stream into one buffer before returning, because the upload
//! that follows needs the complete object.

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;

use crate::config::TtsConfig;
use crate::tts::voices::VoiceConfig;

// ---------------------------------------------------------------------------
// TtsError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum TtsError {
    /// No API key configured for a provider that requires one.
    #[error("text-to-speech API key is not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("text-to-speech request timed out")]
    Timeout,

    #[error("text-to-speech provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The stream finished without yielding any audio.
    #[error("text-to-speech provider returned no audio")]
    EmptyAudio,
}

impl From<reqwest::Error> for TtsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TtsError::Timeout
        } else {
            TtsError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech synthesis.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` with `voice` and return the complete encoded audio.
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, TtsError>;
}

// ---------------------------------------------------------------------------
// ElevenLabsClient
// ---------------------------------------------------------------------------

pub struct ElevenLabsClient {
    client: reqwest::Client,
    config: TtsConfig,
}

impl ElevenLabsClient {
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, TtsError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(TtsError::MissingApiKey)?;

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice.voice_id
        );

        let body = serde_json::json!({
            "text": text,
            "model_id": self.config.model_id,
        });

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("xi-api-key", key)
            .header("accept", "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut audio = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk?);
        }

        if audio.is_empty() {
            return Err(TtsError::EmptyAudio);
        }

        log::debug!(
            "tts: {} bytes of audio for {} chars with voice {}",
            audio.len(),
            text.len(),
            voice.name
        );
        Ok(audio)
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns fixed bytes, fails for any text containing one
/// of the configured markers, and records the peak number of concurrent
/// calls.
#[cfg(test)]
pub struct MockSynthesizer {
    fail_markers: Vec<String>,
    delay: std::time::Duration,
    in_flight: std::sync::atomic::AtomicUsize,
    peak: std::sync::atomic::AtomicUsize,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSynthesizer {
    pub fn ok() -> Self {
        Self::failing_on(Vec::<String>::new())
    }

    pub fn failing_on<S: Into<String>>(markers: Vec<S>) -> Self {
        Self {
            fail_markers: markers.into_iter().map(Into::into).collect(),
            delay: std::time::Duration::from_millis(5),
            in_flight: Default::default(),
            peak: Default::default(),
            calls: Default::default(),
        }
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceConfig) -> Result<Vec<u8>, TtsError> {
        use std::sync::atomic::Ordering;

        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_markers.iter().any(|m| text.contains(m.as_str())) {
            return Err(TtsError::Status {
                status: 500,
                body: "synthetic failure".into(),
            });
        }
        Ok(b"ID3mock-audio".to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
