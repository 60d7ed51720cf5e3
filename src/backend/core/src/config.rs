//! Configuration management.

use serde::Deserialize;

use crate::error::{ErrorCode, PanelError, Result};
use crate::rbac::AccessScope;
use crate::telemetry::{LoggingConfig, MetricsConfig};

/// Environment variable prefix, e.g. `PANEL__SERVER__PORT=8080`.
const ENV_PREFIX: &str = "PANEL";

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Deployment environment (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Repository configuration
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Application API behaviour
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Application API keys
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            repository: RepositoryConfig::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            api_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally visible base URL, used for pagination links
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

/// Which repository implementation backs the API.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryBackend {
    /// Process-local maps, optionally seeded from a JSON file
    #[default]
    Memory,
    /// PostgreSQL via sqlx
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub backend: RepositoryBackend,

    /// PostgreSQL connection URL (required for the postgres backend)
    pub database_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// JSON seed file for the memory backend
    pub seed_path: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            backend: RepositoryBackend::default(),
            database_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            seed_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Page size used when `per_page` is absent
    #[serde(default = "default_per_page")]
    pub default_per_page: u64,

    /// Upper bound applied to `per_page`
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

/// A provisioned application API key.
///
/// Only the SHA-256 digest of the secret half is configured.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyConfig {
    /// 16-character public identifier
    pub identifier: String,

    /// Hex-encoded SHA-256 of the 32-character token
    pub token_hash: String,

    #[serde(default)]
    pub memo: String,

    #[serde(default = "default_true")]
    pub active: bool,

    /// Read capabilities granted to the key
    #[serde(default)]
    pub permissions: AccessScope,
}

// Default value functions
fn default_environment() -> String { "production".to_string() }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_public_url() -> String { "http://localhost:8080".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_per_page() -> u64 { crate::pagination::DEFAULT_PAGE_SIZE }
fn default_max_per_page() -> u64 { crate::pagination::MAX_PAGE_SIZE }
fn default_true() -> bool { true }

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with the environment layered on top.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.api.default_per_page == 0 || self.api.max_per_page == 0 {
            return Err(invalid("api page sizes must be at least 1"));
        }
        if self.api.default_per_page > self.api.max_per_page {
            return Err(invalid("api.default_per_page exceeds api.max_per_page"));
        }
        if self.repository.backend == RepositoryBackend::Postgres
            && self.repository.database_url.is_none()
        {
            return Err(invalid("repository.database_url is required for the postgres backend"));
        }

        for key in &self.api_keys {
            if key.identifier.len() != crate::middleware::auth::IDENTIFIER_LENGTH {
                return Err(invalid(format!(
                    "api key identifier {:?} must be {} characters",
                    key.identifier,
                    crate::middleware::auth::IDENTIFIER_LENGTH
                )));
            }
            if key.token_hash.len() != 64 || hex::decode(&key.token_hash).is_err() {
                return Err(invalid(format!(
                    "api key {} token_hash must be a hex-encoded sha256 digest",
                    key.identifier
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> PanelError {
    PanelError::with_internal(
        ErrorCode::InvalidConfiguration,
        "Configuration file is invalid.",
        message,
    )
}
