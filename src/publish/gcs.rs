//! Google Cloud Storage upload via the JSON API.

use crate::publish::credentials::{ServiceAccountKey, ServiceAccountTokens};
use crate::publish::{BlobStore, PublishError};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_GCS_BASE_URL: &str = "https://storage.googleapis.com";

/// How uploads are authorized.
pub enum GcsAuth {
    /// No `Authorization` header (emulators, public test buckets).
    Anonymous,
    /// A fixed OAuth access token.
    AccessToken(String),
    /// Tokens minted from a service-account key and refreshed before expiry.
    ServiceAccount(ServiceAccountTokens),
}

impl GcsAuth {
    /// Pick the upload credentials. A fixed access token wins over a
    /// service-account key file.
    pub fn from_settings(
        access_token: Option<&str>,
        credentials_path: Option<&Path>,
        timeout_seconds: u64,
    ) -> Result<Self, PublishError> {
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            return Ok(GcsAuth::AccessToken(token.to_string()));
        }

        match credentials_path {
            Some(path) => {
                let key = ServiceAccountKey::load(path)?;
                Ok(GcsAuth::ServiceAccount(ServiceAccountTokens::new(
                    key,
                    timeout_seconds,
                )?))
            }
            None => {
                warn!("No Cloud Storage credentials configured; uploading anonymously");
                Ok(GcsAuth::Anonymous)
            }
        }
    }

    async fn bearer_token(&self) -> Result<Option<String>, PublishError> {
        match self {
            GcsAuth::Anonymous => Ok(None),
            GcsAuth::AccessToken(token) => Ok(Some(token.clone())),
            GcsAuth::ServiceAccount(tokens) => tokens.token().await.map(Some),
        }
    }
}

/// Uploads objects to a Cloud Storage bucket.
pub struct GcsStore {
    bucket: String,
    auth: GcsAuth,
    base_url: String,
    http_client: reqwest::Client,
}

impl GcsStore {
    pub fn new(
        bucket: impl Into<String>,
        auth: GcsAuth,
        base_url: Option<String>,
        timeout_seconds: u64,
    ) -> Result<Self, PublishError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            bucket: bucket.into(),
            auth,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_GCS_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            http_client,
        })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            self.base_url, self.bucket
        )
    }
}

#[async_trait]
impl BlobStore for GcsStore {
    async fn put(
        &self,
        object_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, PublishError> {
        let mut request = self
            .http_client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", object_name)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);

        if let Some(token) = self.auth.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Storage { status, body });
        }
        debug!("Cloud Storage accepted {}", object_name);

        Ok(format!("gs://{}/{}", self.bucket, object_name))
    }
}
