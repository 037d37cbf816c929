// Listing image storage
// Blobs are written under generated keys; the database only stores the relative path.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app_config::MediaConfig;
use crate::utils::ServiceError;

/// Image content types accepted for listings, with the extension used on disk
pub const ACCEPTED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let content_type = content_type.trim().to_ascii_lowercase();
    ACCEPTED_IMAGE_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for ServiceError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::InvalidPath(path) => {
                ServiceError::MediaError(format!("Invalid media path: {}", path))
            },
            MediaError::Io(e) => ServiceError::StorageError(e.to_string()),
        }
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    /// Stores `bytes` under a new key below `prefix`, returning the relative path
    async fn store(&self, prefix: &str, extension: &str, bytes: &[u8])
        -> Result<String, MediaError>;

    /// Removing a path that no longer exists is not an error
    async fn remove(&self, path: &str) -> Result<(), MediaError>;

    fn public_url(&self, path: &str) -> String;
}

/// Filesystem-backed store; the directory is served under `/media`
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(&config.storage_dir, config.public_base_url.clone())
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, MediaError> {
        let is_safe = !path.is_empty()
            && !path.starts_with('/')
            && path
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

        if !is_safe {
            return Err(MediaError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(path))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(
        &self,
        prefix: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let path = format!("{}/{}.{}", prefix.trim_matches('/'), Uuid::new_v4(), extension);
        let full_path = self.resolve(&path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, bytes).await?;

        debug!("Stored {} bytes at {}", bytes.len(), path);
        Ok(path)
    }

    async fn remove(&self, path: &str) -> Result<(), MediaError> {
        let full_path = self.resolve(path)?;

        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Media file already gone: {}", path);
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path)
    }
}
