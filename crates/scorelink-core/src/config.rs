//! Configuration module for ScoreLink.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Role;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for ScoreLink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Peer synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Whether this device is the `primary` or the `dependent` peer.
    pub role: Role,
    /// Milliseconds the primary waits after session activation before its
    /// first push.
    pub settle_delay_ms: u64,
    /// Capacity of the coordinator's request queue.
    pub inbox_capacity: usize,
    /// Capacity of the sync event broadcast channel.
    pub event_capacity: usize,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database holding teams and intervals.
    pub database: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit log lines as JSON instead of human-readable text.
    pub json: bool,
}

impl SyncConfig {
    /// The settle delay as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/scorelink/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("scorelink")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            role: Role::Primary,
            settle_delay_ms: 1000,
            inbox_capacity: 64,
            event_capacity: 128,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("scorelink")
                .join("scoreboard.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.inbox_capacity"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `sync.settle_delay_ms`.
const MAX_SETTLE_DELAY_MS: u64 = 60_000;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            errors.push(ValidationError {
                field: "sync.settle_delay_ms".into(),
                message: format!("must not exceed {MAX_SETTLE_DELAY_MS}"),
            });
        }
        if self.sync.inbox_capacity == 0 {
            errors.push(ValidationError {
                field: "sync.inbox_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.event_capacity == 0 {
            errors.push(ValidationError {
                field: "sync.event_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- store ---
        if self.store.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "store.database".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use scorelink_core::config::ConfigBuilder;
/// use scorelink_core::domain::Role;
///
/// let config = ConfigBuilder::new()
///     .sync_role(Role::Dependent)
///     .sync_settle_delay_ms(250)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_role(mut self, role: Role) -> Self {
        self.config.sync.role = role;
        self
    }

    pub fn sync_settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.settle_delay_ms = ms;
        self
    }

    pub fn sync_inbox_capacity(mut self, n: usize) -> Self {
        self.config.sync.inbox_capacity = n;
        self
    }

    pub fn sync_event_capacity(mut self, n: usize) -> Self {
        self.config.sync.event_capacity = n;
        self
    }

    // --- store ---

    pub fn store_database(mut self, path: PathBuf) -> Self {
        self.config.store.database = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.sync.role, Role::Primary);
        assert_eq!(cfg.sync.settle_delay_ms, 1000);
        assert_eq!(cfg.sync.settle_delay(), Duration::from_secs(1));
        assert_eq!(cfg.sync.inbox_capacity, 64);
        assert_eq!(cfg.sync.event_capacity, 128);
        assert!(cfg.store.database.ends_with("scorelink/scoreboard.db"));
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
sync:
  role: dependent
  settle_delay_ms: 250
  inbox_capacity: 16
  event_capacity: 32
store:
  database: /tmp/scorelink-test.db
logging:
  level: debug
  json: true
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.sync.role, Role::Dependent);
        assert_eq!(cfg.sync.settle_delay_ms, 250);
        assert_eq!(cfg.sync.inbox_capacity, 16);
        assert_eq!(cfg.sync.event_capacity, 32);
        assert_eq!(cfg.store.database, PathBuf::from("/tmp/scorelink-test.db"));
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"sync:\n  role: dependent\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.sync.role, Role::Dependent);
        assert_eq!(cfg.sync.settle_delay_ms, 1000);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.sync.settle_delay_ms, 1000);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_capacities() {
        let mut cfg = Config::default();
        cfg.sync.inbox_capacity = 0;
        cfg.sync.event_capacity = 0;
        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"sync.inbox_capacity".to_string()));
        assert!(fields.contains(&"sync.event_capacity".to_string()));
    }

    #[test]
    fn validate_catches_excessive_settle_delay() {
        let mut cfg = Config::default();
        cfg.sync.settle_delay_ms = 120_000;
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "sync.settle_delay_ms"));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".to_string();
        assert!(cfg.validate().iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validate_catches_empty_database_path() {
        let mut cfg = Config::default();
        cfg.store.database = PathBuf::new();
        assert!(cfg.validate().iter().any(|e| e.field == "store.database"));
    }

    // -- Builder --

    #[test]
    fn builder_overrides_values() {
        let cfg = ConfigBuilder::new()
            .sync_role(Role::Dependent)
            .sync_settle_delay_ms(10)
            .store_database(PathBuf::from("/tmp/x.db"))
            .logging_level("trace")
            .build();
        assert_eq!(cfg.sync.role, Role::Dependent);
        assert_eq!(cfg.sync.settle_delay_ms, 10);
        assert_eq!(cfg.store.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.logging.level, "trace");
    }

    #[test]
    fn builder_build_validated_rejects_invalid() {
        let result = ConfigBuilder::new().logging_level("loud").build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn config_serializes_to_yaml_and_back() {
        let cfg = ConfigBuilder::new().sync_role(Role::Dependent).build();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(yaml.contains("role: dependent"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.sync.role, Role::Dependent);
    }
}
