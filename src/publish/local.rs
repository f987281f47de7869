//! Filesystem-backed object store.

use crate::publish::{BlobStore, PublishError};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Writes objects as files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn put(
        &self,
        object_name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, PublishError> {
        let path = self.root.join(object_name);
        let io_error = |source| PublishError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(io_error)?;
        debug!("Wrote {}", path.display());

        Ok(path.display().to_string())
    }
}
