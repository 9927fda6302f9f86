//! Object storage for synthesized audio.
//!
//! * [`ObjectStorage`]: async trait: upload bytes at a path, get a URL back.
//!   Uploads overwrite any existing object at the same path.
//! * [`SupabaseStorage`]: Supabase Storage REST backend (public or signed
//!   URLs).
//! * [`LocalStorage`]: directory on disk, `file://` URLs.
//! * [`audio_object_path`]: the deterministic path of a section's narration.

pub mod local;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalStorage;
pub use supabase::SupabaseStorage;

/// MIME type of narration objects.
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// `audio/{module_id}/{section_id}.mp3`
pub fn audio_object_path(module_id: &str, section_id: &str) -> String {
    format!("audio/{module_id}/{section_id}.mp3")
}

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Backend is selected but not fully configured.
    #[error("object storage is not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("object storage request timed out")]
    Timeout,

    #[error("Failed to upload object: HTTP {status}: {body}")]
    Upload { status: u16, body: String },

    #[error("Failed to create signed URL: {0}")]
    SignedUrl(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// Paths may not escape the bucket/root.
    #[error("invalid object path: {0}")]
    InvalidPath(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StorageError::Timeout
        } else {
            StorageError::Request(e.to_string())
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// ObjectStorage trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path` (overwriting) and return a retrievable URL.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Reject empty paths, absolute paths and `..` segments.
pub(crate) fn check_path(path: &str) -> Result<(), StorageError> {
    if path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|seg| seg.is_empty() || seg == "..")
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}
