//! Error types for feedesk-config

use thiserror::Error;

/// Stable code for each kind of configuration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    FileNotFound,
    Unreadable,
    InvalidYaml,
    MissingField,
    InvalidValue,
}

impl ConfigErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ConfigErrorCode::Unreadable => "UNREADABLE",
            ConfigErrorCode::InvalidYaml => "INVALID_YAML",
            ConfigErrorCode::MissingField => "MISSING_FIELD",
            ConfigErrorCode::InvalidValue => "INVALID_VALUE",
        }
    }
}

impl std::fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the binary prints when it refuses to start
#[derive(Debug, Clone)]
pub struct ConfigErrorDetails {
    pub code: ConfigErrorCode,
    pub message: String,
    /// Dotted path of the offending key, e.g. `gateway.endpoint`
    pub field: Option<String>,
    pub suggestions: Vec<String>,
}

impl std::fmt::Display for ConfigErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(field) = &self.field {
            write!(f, "\n  at {}", field)?;
        }
        for suggestion in &self.suggestions {
            write!(f, "\n  hint: {}", suggestion)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Cannot read config file {path}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file is not valid YAML: {message}")]
    InvalidYaml { message: String },

    #[error("Missing required setting: {field}")]
    MissingField { field: String },

    #[error("Bad value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn code(&self) -> ConfigErrorCode {
        match self {
            ConfigError::FileNotFound { .. } => ConfigErrorCode::FileNotFound,
            ConfigError::Unreadable { .. } => ConfigErrorCode::Unreadable,
            ConfigError::InvalidYaml { .. } => ConfigErrorCode::InvalidYaml,
            ConfigError::MissingField { .. } => ConfigErrorCode::MissingField,
            ConfigError::InvalidValue { .. } => ConfigErrorCode::InvalidValue,
        }
    }

    fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingField { field } | ConfigError::InvalidValue { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::FileNotFound { .. } => vec![
                "Create one with: feedesk --print-default-config > config.yaml".to_string(),
                "Or try the sample data with: feedesk --demo".to_string(),
            ],
            ConfigError::Unreadable { source, .. } => vec![source.to_string()],
            ConfigError::InvalidYaml { .. } => {
                vec!["Compare the file with the output of --print-default-config.".to_string()]
            }
            ConfigError::MissingField { field } if field == "gateway.endpoint" => vec![
                "Set it to the deployed web app URL of the spreadsheet script.".to_string(),
                "Or run with --demo to use in-memory sample data.".to_string(),
            ],
            ConfigError::MissingField { field } => {
                vec![format!("Add '{}' to the config file.", field)]
            }
            ConfigError::InvalidValue { .. } => Vec::new(),
        }
    }

    /// Code, message, field and hints in one printable value
    pub fn to_details(&self) -> ConfigErrorDetails {
        ConfigErrorDetails {
            code: self.code(),
            message: self.to_string(),
            field: self.field().map(str::to_string),
            suggestions: self.suggestions(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
