//! Error types shared across the dirgate workspace

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration loading/validation errors
///
/// Raised once at startup; unparseable configuration is fatal rather than
/// being deferred to per-request handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required environment variables are missing
    #[error("Missing required environment variables: {0}")]
    MissingVariables(String),

    /// A variable is present but does not parse
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    /// A network ACL token could not be classified
    #[error("Invalid network ACL entry '{0}'")]
    InvalidAclEntry(String),

    /// The derivation-rule table failed to load
    #[error("Invalid derived-permission rule table: {0}")]
    InvalidRuleTable(String),

    /// A referenced file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
