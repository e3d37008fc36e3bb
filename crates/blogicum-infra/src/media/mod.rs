//! Local-disk media storage for post images.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use blogicum_core::ports::{MediaError, MediaStorage};

/// Directory (under the media root) that post images go into.
pub const POST_IMAGES_DIR: &str = "posts_images";

/// Stores files under a root directory.
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path, refusing anything that could escape the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn store(&self, extension: &str, bytes: Vec<u8>) -> Result<String, MediaError> {
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MediaError::InvalidKey(extension.to_string()));
        }

        let key = format!("{}/{}.{}", POST_IMAGES_DIR, Uuid::new_v4(), extension);
        let path = self.resolve(&key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::Io(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| MediaError::Io(e.to_string()))?;

        tracing::debug!(key = %key, "Stored media file");
        Ok(key)
    }

    fn path_of(&self, key: &str) -> Result<PathBuf, MediaError> {
        self.resolve(key)
    }

    async fn remove(&self, key: &str) -> Result<(), MediaError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::Io(e.to_string())),
        }
    }
}
