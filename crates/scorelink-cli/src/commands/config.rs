//! Config command - View and manage ScoreLink configuration
//!
//! `scorelink config show` prints the effective configuration,
//! `scorelink config set <key> <value>` edits one field and saves the file,
//! `scorelink config validate` loads the file strictly and reports every
//! validation error.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use scorelink_core::config::Config;
use scorelink_core::domain::Role;

use crate::output::{get_formatter, OutputFormat};

const SUPPORTED_KEYS: [(&str, &str); 7] = [
    ("sync.role", "primary|dependent"),
    ("sync.settle_delay_ms", "Delay before the primary's first push"),
    ("sync.inbox_capacity", "Coordinator request queue size"),
    ("sync.event_capacity", "Event bus size"),
    ("store.database", "SQLite database path"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.json", "true|false"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.role")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => show(format, config_path),
            ConfigCommand::Set { key, value } => set(format, config_path, key, value),
            ConfigCommand::Validate => validate(format, config_path),
        }
    }
}

fn show(format: OutputFormat, config_path: &Path) -> Result<()> {
    let formatter = get_formatter(format);
    let config = Config::load_or_default(config_path);
    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
        return Ok(());
    }

    let yaml =
        serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
    let lines: Vec<String> = yaml.lines().map(str::to_string).collect();
    formatter.section(&format!("Configuration ({})", config_path.display()), &lines);
    Ok(())
}

fn set(format: OutputFormat, config_path: &Path, key: &str, value: &str) -> Result<()> {
    let formatter = get_formatter(format);
    let mut config = Config::load_or_default(config_path);
    info!(key, value, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "error": e.to_string(),
            }));
        } else {
            formatter.error(&format!("Failed to set '{}': {}", key, e));
            let keys: Vec<String> = SUPPORTED_KEYS
                .iter()
                .map(|(name, help)| format!("{:<22} - {}", name, help))
                .collect();
            formatter.section("Supported keys:", &keys);
        }
        return Ok(());
    }

    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "errors": messages,
            }));
        } else {
            formatter.error(&format!("Invalid value for '{}': {}", key, messages.join("; ")));
        }
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
    std::fs::write(config_path, yaml).context("Failed to write configuration file")?;

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {} = {}", key, value));
        formatter.info(&format!("Saved to {}", config_path.display()));
    }
    Ok(())
}

fn validate(format: OutputFormat, config_path: &Path) -> Result<()> {
    let formatter = get_formatter(format);

    if !config_path.exists() {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": false,
                "config_path": config_path.display().to_string(),
                "errors": ["Configuration file not found. Using defaults."],
            }));
        } else {
            formatter.info(&format!(
                "Configuration file not found at {}",
                config_path.display()
            ));
            formatter.info("Using default configuration.");
        }
        return Ok(());
    }

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [format!("Failed to parse configuration: {:#}", e)],
                }));
            } else {
                formatter.error(&format!("Failed to parse configuration: {:#}", e));
            }
            return Ok(());
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");
    let errors = config.validate();

    if format.is_json() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": messages,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }
    Ok(())
}

/// Applies a dot-notation key/value pair to `config`
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "sync.role" => {
            config.sync.role = value.parse::<Role>()?;
        }
        "sync.settle_delay_ms" => {
            config.sync.settle_delay_ms = value
                .parse()
                .context("Expected a non-negative integer for sync.settle_delay_ms")?;
        }
        "sync.inbox_capacity" => {
            config.sync.inbox_capacity = value
                .parse()
                .context("Expected a positive integer for sync.inbox_capacity")?;
        }
        "sync.event_capacity" => {
            config.sync.event_capacity = value
                .parse()
                .context("Expected a positive integer for sync.event_capacity")?;
        }
        "store.database" => {
            config.store.database = PathBuf::from(value);
        }
        "logging.level" => {
            config.logging.level = value.to_string();
        }
        "logging.json" => {
            config.logging.json = value
                .parse()
                .context("Expected true or false for logging.json")?;
        }
        _ => bail!("Unknown configuration key: {}", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sync_role() {
        let mut config = Config::default();
        apply_config_value(&mut config, "sync.role", "dependent").unwrap();
        assert_eq!(config.sync.role, Role::Dependent);
    }

    #[test]
    fn test_apply_invalid_role_fails() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "sync.role", "leader").is_err());
        assert_eq!(config.sync.role, Role::Primary);
    }

    #[test]
    fn test_apply_settle_delay() {
        let mut config = Config::default();
        apply_config_value(&mut config, "sync.settle_delay_ms", "250").unwrap();
        assert_eq!(config.sync.settle_delay_ms, 250);
    }

    #[test]
    fn test_apply_negative_number_fails() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "sync.inbox_capacity", "-1").is_err());
    }

    #[test]
    fn test_apply_store_database() {
        let mut config = Config::default();
        apply_config_value(&mut config, "store.database", "/tmp/board.db").unwrap();
        assert_eq!(config.store.database, PathBuf::from("/tmp/board.db"));
    }

    #[test]
    fn test_apply_logging_json() {
        let mut config = Config::default();
        apply_config_value(&mut config, "logging.json", "true").unwrap();
        assert!(config.logging.json);
        assert!(apply_config_value(&mut config, "logging.json", "yes").is_err());
    }

    #[test]
    fn test_apply_unknown_key_fails() {
        let mut config = Config::default();
        let err = apply_config_value(&mut config, "sync.root", "/").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_set_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        set(OutputFormat::Json, &path, "sync.settle_delay_ms", "500").unwrap();

        let saved = Config::load(&path).unwrap();
        assert_eq!(saved.sync.settle_delay_ms, 500);
    }

    #[test]
    fn test_set_rejects_invalid_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        set(OutputFormat::Json, &path, "sync.inbox_capacity", "0").unwrap();

        assert!(!path.exists());
    }
}
