//! Configuration file handling.
//!
//! This module handles loading `budget-stats.toml`, applying environment
//! overrides and merging command-line flags. Precedence, lowest first:
//! defaults, file, environment, CLI.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "budget-stats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Upstream GraphQL API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Publishing settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Upstream GraphQL API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// GraphQL endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Sent as `X-API-Key` when no bearer token is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sent as `Authorization: Bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Attempts per query, including the first.
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry, doubled after each failure.
    #[serde(default = "default_retry_delay")]
    pub retry_base_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            bearer_token: None,
            timeout_seconds: default_timeout(),
            max_retries: default_retries(),
            retry_base_delay_ms: default_retry_delay(),
        }
    }
}

fn default_endpoint() -> String {
    "https://ly-budget-gql-dev-1075249966777.asia-east1.run.app/api/graphql".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    500
}

/// Where published statistics go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Google Cloud Storage bucket.
    Gcs,
    /// Directory on the local filesystem.
    Local,
    /// Publishing disabled.
    #[default]
    None,
}

/// Publishing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Bucket name (gcs backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Service-account JSON key used to mint upload tokens (gcs backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<String>,

    /// Fixed OAuth access token; takes precedence over `credentials_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Override for the Cloud Storage API host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs_base_url: Option<String>,

    /// Prefix prepended to every object name.
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Root directory (local backend).
    #[serde(default = "default_local_dir")]
    pub local_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::None,
            bucket: None,
            credentials_path: None,
            access_token: None,
            gcs_base_url: None,
            output_prefix: default_output_prefix(),
            local_dir: default_local_dir(),
        }
    }
}

fn default_output_prefix() -> String {
    "budget-statistics".to_string()
}

fn default_local_dir() -> String {
    "./published".to_string()
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to read variables.
    ///
    /// Each setting reads the `BUDGET_STATS_` name first and the bare
    /// deployment name (`GRAPHQL_ENDPOINT`, `API_TIMEOUT`, ...) second.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(*key).filter(|v| !v.trim().is_empty()))
        };

        if let Some(endpoint) = lookup(&["BUDGET_STATS_GRAPHQL_ENDPOINT", "GRAPHQL_ENDPOINT"]) {
            self.api.endpoint = endpoint;
        }
        if let Some(key) = lookup(&["BUDGET_STATS_API_KEY", "API_KEY"]) {
            self.api.api_key = Some(key);
        }
        if let Some(token) = lookup(&["BUDGET_STATS_BEARER_TOKEN", "BEARER_TOKEN"]) {
            self.api.bearer_token = Some(token);
        }
        if let Some(timeout) = lookup(&["BUDGET_STATS_API_TIMEOUT", "API_TIMEOUT"]) {
            self.api.timeout_seconds = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid API timeout: {}", timeout))?;
        }
        if let Some(retries) = lookup(&["BUDGET_STATS_API_MAX_RETRIES", "API_MAX_RETRIES"]) {
            self.api.max_retries = retries
                .trim()
                .parse()
                .with_context(|| format!("Invalid API max retries: {}", retries))?;
        }
        if let Some(bucket) = lookup(&["GCS_BUCKET_NAME"]) {
            self.storage.bucket = Some(bucket);
            // A bucket in the environment implies Cloud Storage publishing.
            if self.storage.backend == StorageBackend::None {
                self.storage.backend = StorageBackend::Gcs;
            }
        }
        if let Some(token) = lookup(&["GCS_ACCESS_TOKEN"]) {
            self.storage.access_token = Some(token);
        }
        if let Some(path) = lookup(&["GCS_CREDENTIALS_PATH", "GOOGLE_APPLICATION_CREDENTIALS"]) {
            self.storage.credentials_path = Some(path);
        }
        if let Some(prefix) = lookup(&["GCS_OUTPUT_PREFIX"]) {
            self.storage.output_prefix = prefix;
        }
        if let Some(addr) = lookup(&["BUDGET_STATS_LISTEN_ADDR"]) {
            self.server.listen_addr = addr;
        }

        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file and environment settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref endpoint) = args.endpoint {
            self.api.endpoint = endpoint.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let crate::cli::Command::Serve {
            listen: Some(ref listen),
        } = args.command
        {
            self.server.listen_addr = listen.clone();
        }
    }

    /// Check settings that depend on each other.
    pub fn validate(&self) -> Result<()> {
        if !self.api.endpoint.starts_with("http://") && !self.api.endpoint.starts_with("https://") {
            bail!("GraphQL endpoint must start with 'http://' or 'https://'");
        }
        if self.api.max_retries == 0 {
            bail!("api.max_retries must be at least 1");
        }
        if self.storage.backend == StorageBackend::Gcs
            && self.storage.bucket.as_deref().map_or(true, str::is_empty)
        {
            bail!("storage.bucket (or GCS_BUCKET_NAME) is required for the gcs backend");
        }
        self.server
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("Invalid listen address: {}", self.server.listen_addr))?;
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.api.max_retries, 3);
        assert_eq!(config.storage.backend, StorageBackend::None);
        assert_eq!(config.storage.output_prefix, "budget-statistics");
        assert_eq!(config.server.listen_addr, "0.0.0.0:8000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[api]
endpoint = "http://localhost:3000/api/graphql"
bearer_token = "secret"
max_retries = 5

[storage]
backend = "local"
local_dir = "/tmp/stats"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.endpoint, "http://localhost:3000/api/graphql");
        assert_eq!(config.api.bearer_token.as_deref(), Some("secret"));
        assert_eq!(config.api.max_retries, 5);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.local_dir, "/tmp/stats");
        assert_eq!(config.storage.output_prefix, "budget-statistics");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BUDGET_STATS_GRAPHQL_ENDPOINT", "https://example.org/graphql"),
            ("BUDGET_STATS_API_KEY", "key"),
            ("GCS_BUCKET_NAME", "stats-bucket"),
            ("GCS_ACCESS_TOKEN", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api.endpoint, "https://example.org/graphql");
        assert_eq!(config.api.api_key.as_deref(), Some("key"));
        assert_eq!(config.storage.backend, StorageBackend::Gcs);
        assert_eq!(config.storage.bucket.as_deref(), Some("stats-bucket"));
        assert_eq!(config.storage.access_token, None);
    }

    #[test]
    fn test_env_bucket_keeps_explicit_backend() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Local;
        config
            .apply_env_with(|key| (key == "GCS_BUCKET_NAME").then(|| "b".to_string()))
            .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Local);
    }

    #[test]
    fn test_deployment_env_names() {
        let vars: HashMap<&str, &str> = [
            ("GRAPHQL_ENDPOINT", "https://legacy.example/graphql"),
            ("API_KEY", "legacy-key"),
            ("BEARER_TOKEN", "legacy-token"),
            ("API_TIMEOUT", "45"),
            ("API_MAX_RETRIES", "5"),
            ("GCS_OUTPUT_PREFIX", "stats/v2"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/key.json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api.endpoint, "https://legacy.example/graphql");
        assert_eq!(config.api.api_key.as_deref(), Some("legacy-key"));
        assert_eq!(config.api.bearer_token.as_deref(), Some("legacy-token"));
        assert_eq!(config.api.timeout_seconds, 45);
        assert_eq!(config.api.max_retries, 5);
        assert_eq!(config.storage.output_prefix, "stats/v2");
        assert_eq!(
            config.storage.credentials_path.as_deref(),
            Some("/secrets/key.json")
        );
    }

    #[test]
    fn test_prefixed_env_names_win() {
        let vars: HashMap<&str, &str> = [
            ("BUDGET_STATS_API_TIMEOUT", "10"),
            ("API_TIMEOUT", "45"),
            ("GCS_CREDENTIALS_PATH", "/a.json"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/b.json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.storage.credentials_path.as_deref(), Some("/a.json"));
    }

    #[test]
    fn test_invalid_numeric_env() {
        let mut config = Config::default();
        let result =
            config.apply_env_with(|key| (key == "API_MAX_RETRIES").then(|| "many".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_gcs_requires_bucket() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Gcs;
        assert!(config.validate().is_err());

        config.storage.bucket = Some("bucket".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_listen_addr() {
        let mut config = Config::default();
        config.server.listen_addr = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("[server]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
