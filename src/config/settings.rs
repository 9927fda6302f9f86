//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Secrets may be left out of the file and supplied through the environment
//! instead (see [`AppConfig::apply_env_overrides`]).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the structured-output text-generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (no trailing `/v1`).
    pub base_url: String,
    /// Bearer token.  Usually supplied via `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Model identifier sent with every request.
    pub model: String,
    /// Maximum seconds to wait for a completion.  Generation of a full
    /// five-section module is slow, so this is much larger than a chat call.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-5-nano-2025-08-07".into(),
            timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the text-to-speech provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub base_url: String,
    /// Sent as `xi-api-key`.  Usually supplied via `ELEVENLABS_API_KEY`.
    pub api_key: Option<String>,
    /// Synthesis model identifier (multilingual so one model covers every
    /// voice in the table).
    pub model_id: String,
    /// Requested audio encoding (MPEG).
    pub output_format: String,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".into(),
            api_key: None,
            model_id: "eleven_multilingual_v2".into(),
            output_format: "mp3_44100_128".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Where synthesized audio objects are uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files under [`StorageConfig::local_dir`], addressed by `file://` URLs.
    Local,
    /// Supabase Storage bucket over its REST API.
    Supabase,
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Local
    }
}

/// Object-storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Project URL, e.g. `https://xyz.supabase.co`.  Via `SUPABASE_URL`.
    pub supabase_url: Option<String>,
    /// Service-role key.  Via `SUPABASE_SERVICE_ROLE_KEY`.
    pub supabase_key: Option<String>,
    pub bucket: String,
    /// Return public object URLs; when `false` a signed URL is created.
    pub public_urls: bool,
    /// Lifetime of signed URLs in seconds.
    pub signed_url_expiry_secs: u64,
    /// Per-request timeout for the Supabase backend.
    pub timeout_secs: u64,
    /// Root directory for the local backend.  `None` → [`AppPaths::storage_dir`].
    pub local_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            supabase_url: None,
            supabase_key: None,
            bucket: "glossa-modules".into(),
            public_urls: true,
            signed_url_expiry_secs: 60 * 60 * 24 * 365,
            timeout_secs: 60,
            local_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file.  `None` → [`AppPaths::database_file`].
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

/// Knobs for the module-generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Language used when the caller gives none (or a blank one).
    pub default_language: String,
    /// Run the audio stage after persistence.
    pub audio_enabled: bool,
    /// Maximum concurrent text-to-speech requests.  Values below 1 are
    /// treated as 1 (sequential).
    pub audio_concurrency: usize,
    /// Stored on every generated module.
    pub estimated_duration_mins: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_language: "English".into(),
            audio_enabled: true,
            audio_concurrency: 2,
            estimated_duration_mins: 5,
        }
    }
}

impl GenerationConfig {
    /// Effective concurrency cap, never zero.
    pub fn audio_concurrency(&self) -> usize {
        self.audio_concurrency.max(1)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use tutor_talk::config::AppConfig;
///
/// // Load (returns Default when file is missing) and pick up API keys from
/// // the environment.
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env_overrides();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub generation: GenerationConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill secrets and endpoints from the process environment.
    ///
    /// | Variable                    | Field                    |
    /// |-----------------------------|--------------------------|
    /// | `OPENAI_API_KEY`            | `llm.api_key`            |
    /// | `ELEVENLABS_API_KEY`        | `tts.api_key`            |
    /// | `SUPABASE_URL`              | `storage.supabase_url`   |
    /// | `SUPABASE_SERVICE_ROLE_KEY` | `storage.supabase_key`   |
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// explicit lookup, so tests never touch the real environment.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("ELEVENLABS_API_KEY") {
            self.tts.api_key = Some(v);
        }
        if let Some(v) = get("SUPABASE_URL") {
            self.storage.supabase_url = Some(v);
        }
        if let Some(v) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.storage.supabase_key = Some(v);
        }
    }

    /// Resolved SQLite path.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| AppPaths::new().database_file)
    }

    /// Resolved local storage root.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage
            .local_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().storage_dir)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.llm.model, default.llm.model);
        assert_eq!(config.tts.model_id, default.tts.model_id);
        assert_eq!(config.storage.bucket, default.storage.bucket);
        assert_eq!(
            config.generation.default_language,
            default.generation.default_language
        );
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.llm.base_url, "https://api.openai.com");
        assert_eq!(cfg.llm.model, "gpt-5-nano-2025-08-07");
        assert!(cfg.llm.api_key.is_none());
        assert_eq!(cfg.tts.model_id, "eleven_multilingual_v2");
        assert_eq!(cfg.storage.backend, StorageBackend::Local);
        assert_eq!(cfg.storage.bucket, "glossa-modules");
        assert_eq!(cfg.storage.signed_url_expiry_secs, 31_536_000);
        assert_eq!(cfg.generation.default_language, "English");
        assert_eq!(cfg.generation.audio_concurrency, 2);
        assert_eq!(cfg.generation.estimated_duration_mins, 5);
        assert!(cfg.generation.audio_enabled);
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.llm.base_url = "http://localhost:11434".into();
        cfg.llm.api_key = Some("sk-test".into());
        cfg.llm.timeout_secs = 30;
        cfg.tts.output_format = "mp3_22050_32".into();
        cfg.storage.backend = StorageBackend::Supabase;
        cfg.storage.public_urls = false;
        cfg.database.path = Some(dir.path().join("db.sqlite"));
        cfg.generation.audio_concurrency = 1;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.llm.base_url, "http://localhost:11434");
        assert_eq!(loaded.llm.api_key, Some("sk-test".into()));
        assert_eq!(loaded.llm.timeout_secs, 30);
        assert_eq!(loaded.tts.output_format, "mp3_22050_32");
        assert_eq!(loaded.storage.backend, StorageBackend::Supabase);
        assert!(!loaded.storage.public_urls);
        assert_eq!(loaded.database.path, Some(dir.path().join("db.sqlite")));
        assert_eq!(loaded.generation.audio_concurrency, 1);
    }

    /// A file that only sets a few keys keeps defaults for everything else.
    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[generation]\ndefault_language = \"Spanish\"\n").unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.generation.default_language, "Spanish");
        assert_eq!(cfg.generation.audio_concurrency, 2);
        assert_eq!(cfg.llm.model, "gpt-5-nano-2025-08-07");
    }

    #[test]
    fn env_overrides_fill_secrets_and_skip_blanks() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-live"),
            ("ELEVENLABS_API_KEY", "   "),
            ("SUPABASE_URL", "https://proj.supabase.co"),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::default();
        cfg.tts.api_key = Some("from-file".into());
        cfg.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.llm.api_key.as_deref(), Some("sk-live"));
        assert_eq!(cfg.tts.api_key.as_deref(), Some("from-file"));
        assert_eq!(
            cfg.storage.supabase_url.as_deref(),
            Some("https://proj.supabase.co")
        );
        assert!(cfg.storage.supabase_key.is_none());
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let mut g = GenerationConfig::default();
        g.audio_concurrency = 0;
        assert_eq!(g.audio_concurrency(), 1);
    }

    #[test]
    fn explicit_paths_win_over_defaults() {
        let mut cfg = AppConfig::default();
        cfg.database.path = Some(PathBuf::from("/tmp/x.db"));
        cfg.storage.local_dir = Some(PathBuf::from("/tmp/audio"));
        assert_eq!(cfg.database_path(), PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.storage_dir(), PathBuf::from("/tmp/audio"));
    }
}
