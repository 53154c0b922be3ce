//! Configuration management
//!
//! Configuration comes from an optional TOML file overlaid with environment
//! variables, then validated. Every section has defaults, so an empty file
//! (or no file) is a working local setup.

use crate::logging::LogLevel;
use crate::token::{SigningKey, DEFAULT_VALIDITY};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "CHBACK";

/// Store path that selects a private in-memory database
pub const MEMORY_PATH: &str = ":memory:";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    /// Variations and their voter rosters
    pub content_store: StoreConfig,

    /// Accounts, vote histories and the token ledger
    pub account_store: StoreConfig,

    pub token: TokenConfig,

    pub logging: LoggingConfig,

    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,

    /// How long in-flight requests get to finish on shutdown
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// One SQLite store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,

    pub pool_size: u32,

    /// How long to wait for a pooled connection
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    #[serde(with = "humantime_serde")]
    pub validity: Duration,

    /// Hex-encoded signing secret; a random per-process key is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,

    pub json_format: bool,

    /// Include the target module
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics
    pub enabled: bool,

    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl StoreConfig {
    fn with_path(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            pool_size: 8,
            connection_timeout: Duration::from_secs(5),
        }
    }

    pub fn memory() -> Self {
        Self::with_path(MEMORY_PATH)
    }

    pub fn is_memory(&self) -> bool {
        self.path == Path::new(MEMORY_PATH)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_path("./data/store.db")
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            validity: DEFAULT_VALIDITY,
            secret: None,
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("validity", &self.validity)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: SocketAddr::from(([127, 0, 0, 1], 9090)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            content_store: StoreConfig::with_path("./data/content.db"),
            account_store: StoreConfig::with_path("./data/accounts.db"),
            token: TokenConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Both stores in memory; for tests and throwaway runs
    pub fn in_memory() -> Self {
        Self {
            content_store: StoreConfig::memory(),
            account_store: StoreConfig::memory(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables over the defaults
    ///
    /// Environment variables follow the pattern: CHBACK_<SECTION>_<KEY>
    /// Example: CHBACK_ACCOUNT_STORE_PATH=/var/lib/chback/accounts.db
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self = toml::from_str(&contents)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// File if given, environment otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `CHBACK_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Overrides { lookup };

        // Server
        if let Some(addr) = env.parsed("SERVER_BIND_ADDRESS")? {
            self.server.bind_address = addr;
        }
        if let Some(timeout) = env.duration("SERVER_SHUTDOWN_TIMEOUT")? {
            self.server.shutdown_timeout = timeout;
        }

        // Stores
        for (section, store) in [
            ("CONTENT_STORE", &mut self.content_store),
            ("ACCOUNT_STORE", &mut self.account_store),
        ] {
            if let Some(path) = env.raw(&format!("{}_PATH", section)) {
                store.path = PathBuf::from(path);
            }
            if let Some(size) = env.parsed(&format!("{}_POOL_SIZE", section))? {
                store.pool_size = size;
            }
            if let Some(timeout) = env.duration(&format!("{}_CONNECTION_TIMEOUT", section))? {
                store.connection_timeout = timeout;
            }
        }

        // Token
        if let Some(validity) = env.duration("TOKEN_VALIDITY")? {
            self.token.validity = validity;
        }
        if let Some(secret) = env.raw("TOKEN_SECRET") {
            self.token.secret = Some(secret);
        }

        // Logging
        if let Some(level) = env.raw("LOGGING_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = env.parsed("LOGGING_JSON_FORMAT")? {
            self.logging.json_format = json;
        }
        if let Some(with_target) = env.parsed("LOGGING_WITH_TARGET")? {
            self.logging.with_target = with_target;
        }

        // Metrics
        if let Some(enabled) = env.parsed("METRICS_ENABLED")? {
            self.metrics.enabled = enabled;
        }
        if let Some(addr) = env.parsed("METRICS_BIND_ADDRESS")? {
            self.metrics.bind_address = addr;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, store) in [("content_store", &self.content_store), ("account_store", &self.account_store)] {
            if store.pool_size == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{}.pool_size must be greater than 0",
                    name
                )));
            }
        }

        if !self.content_store.is_memory() && self.content_store.path == self.account_store.path {
            return Err(ConfigError::ValidationFailed(
                "content_store and account_store must use different databases".to_string(),
            ));
        }

        if self.token.validity.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "token.validity must be greater than 0".to_string(),
            ));
        }

        if let Some(secret) = &self.token.secret {
            SigningKey::from_hex(secret)
                .map_err(|e| ConfigError::ValidationFailed(format!("token.secret: {}", e)))?;
        }

        if LogLevel::parse(&self.logging.level).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

struct Overrides<F> {
    lookup: F,
}

impl<F> Overrides<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn key(suffix: &str) -> String {
        format!("{}_{}", ENV_PREFIX, suffix)
    }

    fn raw(&self, suffix: &str) -> Option<String> {
        (self.lookup)(&Self::key(suffix)).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, suffix: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.raw(suffix)
            .map(|value| {
                value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: Self::key(suffix),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn duration(&self, suffix: &str) -> Result<Option<Duration>, ConfigError> {
        self.raw(suffix)
            .map(|value| {
                humantime::parse_duration(value.trim()).map_err(|e| {
                    ConfigError::InvalidValue {
                        key: Self::key(suffix),
                        reason: e.to_string(),
                    }
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_configs_validate() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::in_memory().validate().is_ok());
    }

    #[test]
    fn test_same_store_path_rejected() {
        let mut config = Config::default();
        config.account_store.path = config.content_store.path.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.account_store.pool_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.token.validity = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.token.secret = Some("abcd".to_string());
        assert!(config.validate().is_err());

        config.token.secret = Some("not hex at all".to_string());
        assert!(config.validate().is_err());

        config.token.secret = Some("ab".repeat(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(overrides(&[
                ("CHBACK_SERVER_BIND_ADDRESS", "0.0.0.0:9000"),
                ("CHBACK_ACCOUNT_STORE_PATH", "/tmp/accounts.db"),
                ("CHBACK_CONTENT_STORE_POOL_SIZE", "3"),
                ("CHBACK_TOKEN_VALIDITY", "2h"),
                ("CHBACK_LOGGING_JSON_FORMAT", "true"),
                ("CHBACK_METRICS_ENABLED", "true"),
            ]))
            .unwrap();

        assert_eq!(config.server.bind_address.port(), 9000);
        assert_eq!(config.account_store.path, PathBuf::from("/tmp/accounts.db"));
        assert_eq!(config.content_store.pool_size, 3);
        assert_eq!(config.token.validity, Duration::from_secs(7200));
        assert!(config.logging.json_format);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_bad_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(overrides(&[("CHBACK_ACCOUNT_STORE_POOL_SIZE", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("CHBACK_ACCOUNT_STORE_POOL_SIZE"));

        let err = config
            .apply_overrides(overrides(&[("CHBACK_TOKEN_VALIDITY", "forever")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chback.toml");

        let mut config = Config::default();
        config.token.validity = Duration::from_secs(3600);
        config.content_store.pool_size = 2;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.token.validity, Duration::from_secs(3600));
        assert_eq!(loaded.content_store.pool_size, 2);
        assert!(loaded.token.secret.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chback.toml");
        std::fs::write(
            &path,
            "[content_store]\npath = \"c.db\"\n\n[account_store]\npath = \"a.db\"\n\n[token]\nvalidity = \"1day\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.token.validity, Duration::from_secs(86_400));
        assert_eq!(config.account_store.pool_size, 8);
        assert_eq!(config.server.bind_address.port(), 8080);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/chback.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let mut config = Config::default();
        config.token.secret = Some("ab".repeat(32));
        assert!(!format!("{:?}", config).contains("abab"));
    }
}
