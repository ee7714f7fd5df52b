//! Configuration management for the KMS emulator
//!
//! Values come from `KMS_EMULATOR_*` environment variables (optionally via a
//! `.env` file) layered over built-in defaults.


use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix, e.g. `KMS_EMULATOR_LISTEN_ADDR`
pub const ENV_PREFIX: &str = "KMS_EMULATOR";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9010";
pub const DEFAULT_STORE: &str = "memory";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FORMAT: &str = "console";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["console", "json"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// State store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Memory,
}

impl StoreType {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreType::Memory),
            other => Err(ConfigError::Invalid(format!(
                "unsupported store type {:?} (only \"memory\" is available)",
                other
            ))),
        }
    }
}

/// Emulator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmulatorConfig {
    pub listen_addr: String,
    pub seed_file: Option<PathBuf>,
    pub store: String,
    pub log_level: String,
    pub log_format: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            seed_file: None,
            store: DEFAULT_STORE.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl EmulatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::load(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    /// Load configuration from explicit `KMS_EMULATOR_*` variables instead of
    /// the process environment
    pub fn from_source(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(Some(vars)),
        )
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("listen_addr", DEFAULT_LISTEN_ADDR)?
            .set_default("store", DEFAULT_STORE)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .set_default("log_format", DEFAULT_LOG_FORMAT)?
            .add_source(environment)
            .build()?;

        let config: EmulatorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value; loading already calls this
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        self.store_type()?;

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level {:?} (expected one of {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        if !LOG_FORMATS.contains(&self.log_format.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log format {:?} (expected one of {})",
                self.log_format,
                LOG_FORMATS.join(", ")
            )));
        }
        if let Some(path) = &self.seed_file {
            if !is_yaml(path) {
                return Err(ConfigError::Invalid(format!(
                    "seed file {} must have a .yaml or .yml extension",
                    path.display()
                )));
            }
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "request timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|e| {
            ConfigError::Invalid(format!("invalid listen address {:?}: {}", self.listen_addr, e))
        })
    }

    pub fn store_type(&self) -> Result<StoreType, ConfigError> {
        StoreType::parse(&self.store)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Log level in the form expected by the env filter
    pub fn log_level(&self) -> String {
        self.log_level.to_ascii_lowercase()
    }
}

/// Whether `path` carries a YAML extension
pub fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}
