//! Error types for the config crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(wharf_config::io))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(
        code(wharf_config::toml),
        help("Check your configuration syntax")
    )]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid duration '{0}'")]
    #[diagnostic(
        code(wharf_config::invalid_duration),
        help("Use a string like '30s', '2m', '1h' or '1d'")
    )]
    InvalidDuration(String),

    #[error("Duplicate uplink '{0}'")]
    #[diagnostic(
        code(wharf_config::duplicate_uplink),
        help("Every uplink must have a unique name")
    )]
    DuplicateUplink(String),

    #[error("Package rule '{pattern}' references unknown uplink '{uplink}'")]
    #[diagnostic(
        code(wharf_config::unknown_uplink),
        help("Proxy lists may only name uplinks declared in [[uplinks]]")
    )]
    UnknownUplink { pattern: String, uplink: String },
}

/// A specialized Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
