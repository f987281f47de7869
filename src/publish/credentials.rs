//! Service-account OAuth tokens for Cloud Storage.
//!
//! Exchanges a signed JWT assertion for an access token at the key's
//! token endpoint and caches it until shortly before it expires.

use crate::publish::PublishError;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service-account JSON key file used for token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Load a key file as downloaded from the cloud console.
    pub fn load(path: &Path) -> Result<Self, PublishError> {
        let content = std::fs::read_to_string(path).map_err(|source| PublishError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|e| {
            PublishError::Credentials(format!(
                "Invalid service account key {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

/// Issues and caches access tokens for one service account.
pub struct ServiceAccountTokens {
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    encoding_key: EncodingKey,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey, timeout_seconds: u64) -> Result<Self, PublishError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| PublishError::Credentials(format!("Invalid private key: {}", e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        info!("Using service account {}", key.client_email);

        Ok(Self {
            client_email: key.client_email,
            key_id: key.private_key_id,
            token_uri: key.token_uri,
            encoding_key,
            http_client,
            cached: Mutex::new(None),
        })
    }

    /// Return a valid access token, fetching a new one if the cached one
    /// is missing or about to expire.
    pub async fn token(&self) -> Result<String, PublishError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - EXPIRY_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn assertion(&self, now: i64) -> Result<String, PublishError> {
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: STORAGE_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| PublishError::Credentials(format!("Failed to sign assertion: {}", e)))
    }

    async fn fetch(&self, now: i64) -> Result<CachedToken, PublishError> {
        debug!("Requesting access token from {}", self.token_uri);
        let assertion = self.assertion(now)?;

        let response = self
            .http_client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Credentials(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Credentials(format!("Invalid token response: {}", e)))?;

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}
