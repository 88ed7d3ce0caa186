use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Docingest client.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the document-intelligence service.
    pub api_base_url: String,
    /// Tenant identifier attached to every request as `x-tenant-id`.
    pub tenant_id: String,
    /// User identifier attached to every request as `x-user-id`.
    pub user_id: String,
    /// Optional gateway subscription key attached when present.
    pub subscription_key: Option<String>,
    /// Interval between status polls, in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Optional override for the per-file upload size cap, in bytes.
    pub max_file_bytes: Option<usize>,
    /// Optional override for the upload queue capacity.
    pub max_queue_files: Option<usize>,
}

/// Default status-poll cadence when no override is configured.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: load_env("DOCINGEST_API_BASE_URL")?,
            tenant_id: load_env("DOCINGEST_TENANT_ID")?,
            user_id: load_env("DOCINGEST_USER_ID")?,
            subscription_key: load_env_optional("DOCINGEST_SUBSCRIPTION_KEY"),
            poll_interval_ms: load_env_optional("DOCINGEST_POLL_INTERVAL_MS")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("DOCINGEST_POLL_INTERVAL_MS".into()))
                })
                .transpose()?,
            max_file_bytes: load_env_optional("DOCINGEST_MAX_FILE_BYTES")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("DOCINGEST_MAX_FILE_BYTES".into()))
                })
                .transpose()?,
            max_queue_files: load_env_optional("DOCINGEST_MAX_QUEUE_FILES")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("DOCINGEST_MAX_QUEUE_FILES".into()))
                })
                .transpose()?,
        })
    }

    /// Status-poll cadence as a [`Duration`], falling back to the default.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        api_base_url = %config.api_base_url,
        tenant = %config.tenant_id,
        poll_interval_ms = ?config.poll_interval_ms,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
