//! Configuration management for feedesk
//!
//! This module handles loading, validation, and management of
//! feedesk configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use error::{ConfigError, ConfigErrorCode, ConfigErrorDetails, ConfigResult};

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

/// Remote spreadsheet API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Web app URL that answers `?action=get&sheet=` and JSON POSTs
    #[serde(default)]
    pub endpoint: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sheet (tab) names
    #[serde(default)]
    pub sheets: SheetNames,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            sheets: SheetNames::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}

/// Names of the four sheets the front end reads and writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetNames {
    #[serde(default = "default_students_sheet")]
    pub students: String,
    #[serde(default = "default_transactions_sheet")]
    pub transactions: String,
    #[serde(default = "default_expenses_sheet")]
    pub expenses: String,
    #[serde(default = "default_staff_sheet")]
    pub staff: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            students: default_students_sheet(),
            transactions: default_transactions_sheet(),
            expenses: default_expenses_sheet(),
            staff: default_staff_sheet(),
        }
    }
}

fn default_students_sheet() -> String {
    "Sheet1".to_string()
}

fn default_transactions_sheet() -> String {
    "Transactions".to_string()
}

fn default_expenses_sheet() -> String {
    "Expenses".to_string()
}

fn default_staff_sheet() -> String {
    "Staff".to_string()
}

/// School details used on receipts and reminder messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolConfig {
    #[serde(default = "default_school_name")]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            name: default_school_name(),
            address: String::new(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

fn default_school_name() -> String {
    "K D Memorial School".to_string()
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

/// WhatsApp reminder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Prefix added to 10-digit local numbers
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// Pause between two links of a bulk send
    #[serde(default = "default_bulk_delay_ms")]
    pub bulk_delay_ms: u64,
    /// Custom reminder text with {name}, {balance}, {class} placeholders
    #[serde(default)]
    pub reminder_template: Option<String>,
    /// Write the reminder date back to the student row
    #[serde(default = "default_true")]
    pub record_reminders: bool,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            bulk_delay_ms: default_bulk_delay_ms(),
            reminder_template: None,
            record_reminders: true,
        }
    }
}

fn default_country_code() -> String {
    "91".to_string()
}

fn default_bulk_delay_ms() -> u64 {
    3000
}

/// Feature toggles
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeaturesConfig {
    /// Create a placeholder staff row when the staff sheet is empty
    #[serde(default = "default_false")]
    pub seed_default_staff: bool,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote API settings
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// School details
    #[serde(default)]
    pub school: SchoolConfig,
    /// Reminder settings
    #[serde(default)]
    pub messaging: MessagingConfig,
    /// Feature toggles
    #[serde(default)]
    pub features: FeaturesConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content =
            std::fs::read_to_string(&path).map_err(|source| ConfigError::Unreadable {
                path: path.display().to_string(),
                source,
            })?;
        let config = Self::from_yaml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text without validating it
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if self.gateway.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "gateway.endpoint".to_string(),
            });
        }

        if !self.gateway.endpoint.starts_with("http://")
            && !self.gateway.endpoint.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "gateway.endpoint".to_string(),
                reason: "Endpoint must be an http:// or https:// URL".to_string(),
            });
        }

        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        let sheets = &self.gateway.sheets;
        for (field, name) in [
            ("gateway.sheets.students", &sheets.students),
            ("gateway.sheets.transactions", &sheets.transactions),
            ("gateway.sheets.expenses", &sheets.expenses),
            ("gateway.sheets.staff", &sheets.staff),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        let code = &self.messaging.country_code;
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue {
                field: "messaging.country_code".to_string(),
                reason: "Country code must contain digits only, without '+'".to_string(),
            });
        }

        if self.messaging.bulk_delay_ms > 60_000 {
            return Err(ConfigError::InvalidValue {
                field: "messaging.bulk_delay_ms".to_string(),
                reason: "Bulk delay must be at most 60000 ms".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Log level must be one of {}", LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        let mut config = Config::default();
        config.gateway.endpoint = "https://example.test/exec".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.gateway.sheets.students, "Sheet1");
        assert_eq!(config.gateway.sheets.transactions, "Transactions");
        assert_eq!(config.messaging.country_code, "91");
        assert!(!config.features.seed_default_staff);
    }

    #[test]
    fn test_default_template_parses() {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.sheets.staff, "Staff");
        assert_eq!(config.messaging.bulk_delay_ms, 3000);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml("gateway:\n  endpoint: \"http://localhost:9000\"\n").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.timeout_secs, 20);
        assert_eq!(config.school.currency_symbol, "₹");
    }

    #[test]
    fn test_missing_endpoint() {
        let err = Config::default().validate().unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::MissingField);
    }

    #[test]
    fn test_invalid_country_code() {
        let mut config = valid();
        config.messaging.country_code = "+91".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::InvalidValue);
        assert_eq!(err.to_details().field.as_deref(), Some("messaging.country_code"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = valid();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml("server: [").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::InvalidYaml);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(PathBuf::from("/nonexistent/feedesk.yaml")).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::FileNotFound);
        assert!(!err.to_details().suggestions.is_empty());
    }
}
