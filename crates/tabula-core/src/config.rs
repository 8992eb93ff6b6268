//! # Engine Configuration
//!
//! Process-wide settings shared by every table handle.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TABULA_DIALECT=mysql                                               │
//! │     TABULA_TRANSLATE_ERRORS=false                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     passed explicitly to EngineConfig::load                            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     sqlite, ISO dates, translation on                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tabula.toml
//! dialect = "mysql"               # mysql | sqlserver | sqlite
//! date_format = "%Y-%m-%d"
//! datetime_format = "%Y-%m-%d %H:%M:%S"
//! translate_errors = true
//! sequence_function = "nextval"   # MySQL only
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dialect::{Dialect, DialectKind};
use crate::error::{CoreError, CoreResult};

/// Settings consumed by the codec, the compiler and the error translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target SQL dialect.
    #[serde(default)]
    pub dialect: DialectKind,

    /// chrono format for date columns.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// chrono format for datetime/timestamp columns.
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,

    /// Replace driver messages with user-facing ones for known vendor codes.
    #[serde(default = "default_true")]
    pub translate_errors: bool,

    /// Stored function used by the MySQL next-id strategy.
    #[serde(default = "default_sequence_function")]
    pub sequence_function: String,
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_datetime_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sequence_function() -> String {
    "nextval".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            dialect: DialectKind::default(),
            date_format: default_date_format(),
            datetime_format: default_datetime_format(),
            translate_errors: default_true(),
            sequence_function: default_sequence_function(),
        }
    }
}

impl EngineConfig {
    // =========================================================================
    // Loading
    // =========================================================================

    /// Loads configuration: file (if it exists), then environment, then
    /// validation.
    pub fn load(config_path: Option<PathBuf>) -> CoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
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

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CoreResult<()> {
        check_format("date_format", &self.date_format)?;
        check_format("datetime_format", &self.datetime_format)?;

        let mut chars = self.sequence_function.chars();
        let plain = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if !plain {
            return Err(CoreError::InvalidConfig(format!(
                "sequence_function must be a plain identifier, got: '{}'",
                self.sequence_function
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `TABULA_*` overrides from any key lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dialect) = lookup("TABULA_DIALECT") {
            match dialect.parse() {
                Ok(parsed) => {
                    debug!(dialect = %dialect, "Overriding dialect from environment");
                    self.dialect = parsed;
                }
                Err(_) => warn!(dialect = %dialect, "Unknown dialect in environment"),
            }
        }

        if let Some(format) = lookup("TABULA_DATE_FORMAT") {
            self.date_format = format;
        }

        if let Some(format) = lookup("TABULA_DATETIME_FORMAT") {
            self.datetime_format = format;
        }

        if let Some(flag) = lookup("TABULA_TRANSLATE_ERRORS") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.translate_errors = true,
                "0" | "false" | "no" | "off" => self.translate_errors = false,
                _ => warn!(value = %flag, "Invalid TABULA_TRANSLATE_ERRORS in environment"),
            }
        }

        if let Some(function) = lookup("TABULA_SEQUENCE_FUNCTION") {
            self.sequence_function = function;
        }
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    pub fn with_translate_errors(mut self, enabled: bool) -> Self {
        self.translate_errors = enabled;
        self
    }

    pub fn with_sequence_function(mut self, function: impl Into<String>) -> Self {
        self.sequence_function = function.into();
        self
    }

    /// Instantiates the configured dialect.
    pub fn build_dialect(&self) -> Arc<dyn Dialect> {
        self.dialect.build(&self.sequence_function)
    }
}

fn check_format(field: &str, format: &str) -> CoreResult<()> {
    if format.trim().is_empty() {
        return Err(CoreError::InvalidConfig(format!("{} must not be empty", field)));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(CoreError::InvalidConfig(format!(
            "{} has an invalid format specifier: '{}'",
            field, format
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.dialect, DialectKind::Sqlite);
        assert_eq!(config.date_format, "%Y-%m-%d");
        assert_eq!(config.datetime_format, "%Y-%m-%d %H:%M:%S");
        assert!(config.translate_errors);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.date_format = String::new();
        assert!(config.validate().is_err());

        config.date_format = "%Y-%Q".to_string();
        assert!(config.validate().is_err());

        config.date_format = "%d/%m/%Y".to_string();
        assert!(config.validate().is_ok());

        config.sequence_function = "nextval('x'); --".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_parsing_with_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            dialect = "mssql"
            translate_errors = false
            "#,
        )
        .unwrap();

        assert_eq!(config.dialect, DialectKind::SqlServer);
        assert!(!config.translate_errors);
        assert_eq!(config.date_format, "%Y-%m-%d");
        assert_eq!(config.build_dialect().name(), "sqlserver");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::default().with_dialect(DialectKind::MySql);
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("dialect = \"mysql\""));

        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TABULA_DIALECT", "mysql"),
            ("TABULA_DATE_FORMAT", "%d.%m.%Y"),
            ("TABULA_TRANSLATE_ERRORS", "off"),
            ("TABULA_SEQUENCE_FUNCTION", "zion_nextval"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.dialect, DialectKind::MySql);
        assert_eq!(config.date_format, "%d.%m.%Y");
        assert!(!config.translate_errors);
        assert_eq!(config.sequence_function, "zion_nextval");
    }

    #[test]
    fn test_invalid_override_is_ignored() {
        let mut config = EngineConfig::default();
        config.apply_overrides(|key| (key == "TABULA_DIALECT").then(|| "oracle".to_string()));
        assert_eq!(config.dialect, DialectKind::Sqlite);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("tabula-config-{}.toml", std::process::id()));
        std::fs::write(&path, "dialect = \"sqlserver\"\ndate_format = \"%d/%m/%Y\"\n").unwrap();

        let config = EngineConfig::load(Some(path.clone())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.date_format, "%d/%m/%Y");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = EngineConfig::load_or_default(Some(PathBuf::from("/nonexistent/tabula.toml")));
        assert_eq!(config.date_format, "%Y-%m-%d");
    }
}
