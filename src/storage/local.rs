//! Filesystem-backed object storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{check_path, ObjectStorage, StorageError};

/// Writes objects under `root`, mirroring the object path as a relative file
/// path.  Returned URLs use the `file://` scheme.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        check_path(path)?;

        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;

        let absolute = match tokio::fs::canonicalize(&target).await {
            Ok(p) => p,
            Err(_) => target,
        };
        Ok(format!("file://{}", absolute.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_and_overwrites() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert_eq!(storage.root(), dir.path());

        let url = storage
            .upload("audio/m/s.mp3", b"first".to_vec(), "audio/mpeg")
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("audio/m/s.mp3"));

        storage
            .upload("audio/m/s.mp3", b"second".to_vec(), "audio/mpeg")
            .await
            .unwrap();
        let on_disk = std::fs::read(dir.path().join("audio/m/s.mp3")).unwrap();
        assert_eq!(on_disk, b"second");
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let err = storage
            .upload("../outside.mp3", vec![1], "audio/mpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }
}
