//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\tutor-talk\
//!   macOS:   ~/Library/Application Support/tutor-talk/
//!   Linux:   ~/.config/tutor-talk/
//!
//! Data dir (database + locally stored audio):
//!   Windows: %LOCALAPPDATA%\tutor-talk\
//!   macOS:   ~/Library/Application Support/tutor-talk/
//!   Linux:   ~/.local/share/tutor-talk/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for the SQLite database and local object storage.
    pub data_dir: PathBuf,
    /// Default SQLite database file.
    pub database_file: PathBuf,
    /// Default root for [`crate::storage::LocalStorage`].
    pub storage_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "tutor-talk";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let database_file = data_dir.join("tutor-talk.db");
        let storage_dir = data_dir.join("storage");

        Self {
            config_dir,
            settings_file,
            data_dir,
            database_file,
            storage_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
