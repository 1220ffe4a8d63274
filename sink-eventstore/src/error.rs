//! Error types for the Event Store sink connector
//!
//! Every validation failure surfaces as a single [`ConfigError`] carrying a
//! [`ConfigErrorReason`] code and a human-readable message.

use std::fmt;
use thiserror::Error;

/// Reason code attached to every [`ConfigError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigErrorReason {
    /// Both or neither of the literal connection and the named service config were supplied
    AmbiguousConnectionSource,
    /// A boolean-like flag was neither a boolean nor "true"/"false"
    InvalidBooleanFlag,
    /// A numeric knob was not a strictly positive integer
    InvalidNumericParameter,
    /// A key-column list was empty, blank, or contained duplicates
    InvalidKeyColumns,
    /// The result schema is not the input schema plus one boolean column
    ResultSchemaMismatch,
    /// The named service configuration could not be resolved
    ServiceConfigNotFound,
    /// A required parameter is absent or blank
    MissingParameter,
    /// A parameter name is not recognized
    UnknownParameter,
    /// A parameter was supplied under more than one of its names
    DuplicateParameter,
    /// A parameter has the wrong value type
    InvalidParameterType,
    /// The connection endpoint string is malformed
    InvalidConnectionString,
    /// A row schema could not be parsed
    InvalidSchema,
    /// The operator toolkit could not be located
    ToolkitNotFound,
    /// A configuration file could not be read
    Io,
    /// A configuration file could not be parsed
    Parse,
}

impl ConfigErrorReason {
    /// Short reason label used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorReason::AmbiguousConnectionSource => "ambiguous connection source",
            ConfigErrorReason::InvalidBooleanFlag => "invalid boolean flag",
            ConfigErrorReason::InvalidNumericParameter => "invalid numeric parameter",
            ConfigErrorReason::InvalidKeyColumns => "invalid key columns",
            ConfigErrorReason::ResultSchemaMismatch => "result schema mismatch",
            ConfigErrorReason::ServiceConfigNotFound => "service config not found",
            ConfigErrorReason::MissingParameter => "missing parameter",
            ConfigErrorReason::UnknownParameter => "unknown parameter",
            ConfigErrorReason::DuplicateParameter => "duplicate parameter",
            ConfigErrorReason::InvalidParameterType => "invalid parameter type",
            ConfigErrorReason::InvalidConnectionString => "invalid connection string",
            ConfigErrorReason::InvalidSchema => "invalid schema",
            ConfigErrorReason::ToolkitNotFound => "toolkit not found",
            ConfigErrorReason::Io => "io error",
            ConfigErrorReason::Parse => "parse error",
        }
    }
}

impl fmt::Display for ConfigErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration error raised while building or loading a connector configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}: {message}")]
pub struct ConfigError {
    reason: ConfigErrorReason,
    message: String,
}

impl ConfigError {
    pub fn new(reason: ConfigErrorReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn reason(&self) -> ConfigErrorReason {
        self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn ambiguous_connection(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorReason::AmbiguousConnectionSource, message)
    }

    pub fn invalid_flag(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorReason::InvalidBooleanFlag, message)
    }

    pub fn invalid_number(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorReason::InvalidNumericParameter, message)
    }

    pub fn invalid_keys(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorReason::InvalidKeyColumns, message)
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorReason::ResultSchemaMismatch, message)
    }

    pub fn service_not_found(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorReason::ServiceConfigNotFound, message)
    }

    pub fn missing(parameter: &str) -> Self {
        Self::new(
            ConfigErrorReason::MissingParameter,
            format!("'{}' is required and cannot be empty", parameter),
        )
    }

    pub fn invalid_type(parameter: &str, expected: &str) -> Self {
        Self::new(
            ConfigErrorReason::InvalidParameterType,
            format!("'{}' must be {}", parameter, expected),
        )
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ConfigErrorReason::Io, err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::new(ConfigErrorReason::Parse, err.to_string())
    }
}

/// Result type for connector configuration operations
pub type ConnectorResult<T> = std::result::Result<T, ConfigError>;
