//! Storage for uploaded post images.

use std::path::PathBuf;

use async_trait::async_trait;

/// Where uploaded images live. Keys are relative paths like `posts_images/<uuid>.png`.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store bytes under a fresh key derived from `extension`. Returns the key.
    async fn store(&self, extension: &str, bytes: Vec<u8>) -> Result<String, MediaError>;

    /// Filesystem path a key resolves to. The file may not exist.
    fn path_of(&self, key: &str) -> Result<PathBuf, MediaError>;

    /// Remove a stored file. Missing files are not an error.
    async fn remove(&self, key: &str) -> Result<(), MediaError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid media key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O failed: {0}")]
    Io(String),
}
