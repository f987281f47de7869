//! Publishing computed statistics to object storage.
//!
//! [`Publisher`] decides object names and serializes reports; the
//! [`BlobStore`] implementations only move bytes.

pub mod credentials;
pub mod gcs;
pub mod local;

pub use credentials::{ServiceAccountKey, ServiceAccountTokens};
pub use gcs::{GcsAuth, GcsStore};
pub use local::LocalStore;

use crate::models::YearReport;
use crate::report::{generate_json_report, ReportMode};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Errors raised while publishing.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to serialize statistics: {0}")]
    Serialize(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cloud Storage credentials error: {0}")]
    Credentials(String),

    #[error("Object storage error {status}: {body}")]
    Storage { status: u16, body: String },

    #[error("Failed to reach object storage: {0}")]
    Network(#[from] reqwest::Error),
}

/// Destination for published objects.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `object_name`, replacing any existing object.
    /// Returns the location of the written object.
    async fn put(
        &self,
        object_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, PublishError>;
}

/// How published objects are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectNaming {
    /// `{kind}_latest.json`, overwritten on every publish.
    Latest,
    /// `{kind}_{YYYYMMDD_HHMMSS}.json`.
    Timestamped,
}

impl ObjectNaming {
    pub fn from_use_latest(use_latest: bool) -> Self {
        if use_latest {
            Self::Latest
        } else {
            Self::Timestamped
        }
    }
}

/// Names, serializes and uploads statistics reports.
pub struct Publisher {
    store: Arc<dyn BlobStore>,
    prefix: String,
}

impl Publisher {
    pub fn new(store: Arc<dyn BlobStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Object name for a report published at `now`.
    pub fn object_name(&self, mode: ReportMode, naming: ObjectNaming, now: DateTime<Local>) -> String {
        let file_name = match naming {
            ObjectNaming::Latest => format!("{}_latest.json", mode.slug()),
            ObjectNaming::Timestamped => {
                format!("{}_{}.json", mode.slug(), now.format("%Y%m%d_%H%M%S"))
            }
        };

        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            file_name
        } else {
            format!("{}/{}", prefix, file_name)
        }
    }

    /// Serialize and upload reports. Returns the stored location.
    pub async fn publish(
        &self,
        mode: ReportMode,
        naming: ObjectNaming,
        reports: &[YearReport],
    ) -> Result<String, PublishError> {
        let object_name = self.object_name(mode, naming, Local::now());
        let content =
            generate_json_report(reports).map_err(|e| PublishError::Serialize(e.to_string()))?;

        info!(
            "Uploading {} ({} bytes, {} years)",
            object_name,
            content.len(),
            reports.len()
        );
        let location = self
            .store
            .put(&object_name, content.into_bytes(), JSON_CONTENT_TYPE)
            .await?;
        info!("Successfully uploaded to {}", location);

        Ok(location)
    }
}
