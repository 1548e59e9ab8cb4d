//! # Engine Configuration
//!
//! Configuration management for the rental engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Load Order (later overrides earlier)                 │
//! │                                                                         │
//! │  1. Defaults (EngineConfig::default)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. stockhire.toml                                                     │
//! │     --config flag → STOCKHIRE_CONFIG → platform config dir             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Environment (STOCKHIRE_DB_PATH, STOCKHIRE_MAX_RETRIES, ...)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. validate()                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockhire.toml
//! [database]
//! path = "/var/lib/stockhire/stockhire.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [engine]
//! max_retries = 5
//! retry_backoff_ms = 20
//! max_backoff_ms = 1000
//! default_page_size = 20
//!
//! [directory]
//! default_country_code = "44"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use stockhire_core::MAX_PAGE_SIZE;
use stockhire_db::DbConfig;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Database Settings
// =============================================================================

/// Where the SQLite file lives and how the pool is sized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a connection waits on a locked database (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "stockhire", "stockhire")
        .map(|dirs| dirs.data_dir().join("stockhire.db"))
        .unwrap_or_else(|| PathBuf::from("stockhire.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Retry and listing behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Retries after the first attempt when SQLite reports a write conflict.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay (milliseconds). Grows exponentially with jitter.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Page size for listings that don't ask for one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_backoff() -> u64 {
    20
}

fn default_max_backoff() -> u64 {
    1000
}

fn default_page_size() -> u32 {
    stockhire_core::DEFAULT_PAGE_SIZE
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
            max_backoff_ms: default_max_backoff(),
            default_page_size: default_page_size(),
        }
    }
}

// =============================================================================
// Directory Settings
// =============================================================================

/// Customer directory behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Country calling code for phone numbers entered without one.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

fn default_country_code() -> String {
    "1".to_string()
}

impl Default for DirectorySettings {
    fn default() -> Self {
        DirectorySettings {
            default_country_code: default_country_code(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub directory: DirectorySettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stockhire.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var_os("STOCKHIRE_CONFIG").map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document and validates it.
    pub fn from_toml(contents: &str) -> EngineResult<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.engine.retry_backoff_ms > self.engine.max_backoff_ms {
            return Err(EngineError::Config(format!(
                "engine.retry_backoff_ms ({}) exceeds engine.max_backoff_ms ({})",
                self.engine.retry_backoff_ms, self.engine.max_backoff_ms
            )));
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.engine.default_page_size) {
            return Err(EngineError::Config(format!(
                "engine.default_page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let code = self.directory.default_country_code.trim_start_matches('+');
        if code.is_empty() || code.len() > 3 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::Config(format!(
                "directory.default_country_code must be 1-3 digits, got '{}'",
                self.directory.default_country_code
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key/value source.
    ///
    /// Unparseable numbers are logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("STOCKHIRE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("STOCKHIRE_MAX_CONNECTIONS") {
            match raw.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid STOCKHIRE_MAX_CONNECTIONS"),
            }
        }

        if let Some(raw) = lookup("STOCKHIRE_MAX_RETRIES") {
            match raw.parse::<u32>() {
                Ok(n) => self.engine.max_retries = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid STOCKHIRE_MAX_RETRIES"),
            }
        }

        if let Some(raw) = lookup("STOCKHIRE_RETRY_BACKOFF_MS") {
            match raw.parse::<u64>() {
                Ok(n) => self.engine.retry_backoff_ms = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid STOCKHIRE_RETRY_BACKOFF_MS"),
            }
        }

        if let Some(code) = lookup("STOCKHIRE_DEFAULT_COUNTRY_CODE") {
            self.directory.default_country_code = code;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockhire", "stockhire")
            .map(|dirs| dirs.config_dir().join("stockhire.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Builds the pool configuration for [`stockhire_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    /// First retry delay.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.engine.retry_backoff_ms)
    }

    /// Longest retry delay.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.engine.max_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.max_retries, 5);
        assert_eq!(config.engine.default_page_size, 20);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [database]
            path = "/tmp/hire.db"

            [directory]
            default_country_code = "+44"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/hire.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.directory.default_country_code, "+44");
        assert_eq!(config.engine, EngineSettings::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.engine.default_page_size = 500;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.engine.retry_backoff_ms = 5000;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.directory.default_country_code = "UK".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STOCKHIRE_DB_PATH", "/data/override.db"),
            ("STOCKHIRE_MAX_RETRIES", "9"),
            ("STOCKHIRE_RETRY_BACKOFF_MS", "not-a-number"),
            ("STOCKHIRE_DEFAULT_COUNTRY_CODE", "33"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/override.db"));
        assert_eq!(config.engine.max_retries, 9);
        assert_eq!(config.engine.retry_backoff_ms, 20);
        assert_eq!(config.directory.default_country_code, "33");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = EngineConfig::load(Some(PathBuf::from("/nonexistent/stockhire.toml")));
        assert!(config.is_ok());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("stockhire-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[database\nmax_connections = 0").unwrap();

        let result = EngineConfig::load(Some(path.clone()));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_invalid_values_in_file_are_an_error() {
        let path = std::env::temp_dir().join(format!("stockhire-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[database]\nmax_connections = 0\n").unwrap();

        let result = EngineConfig::load(Some(path.clone()));
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("max_connections"));
    }

    #[test]
    fn test_db_config() {
        let mut config = EngineConfig::default();
        config.database.busy_timeout_ms = 250;
        let db = config.db_config();
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
        assert_eq!(db.max_connections, 5);
    }
}
