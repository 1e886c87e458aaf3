//! Error types for plugkit

use thiserror::Error;

/// Result type alias for plugkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the plugin runtime
#[derive(Debug, Error)]
pub enum Error {
    /// Naming prefix is not usable as a module name pattern
    #[error("invalid module prefix: {0:?}")]
    InvalidPrefix(String),

    /// Hook name has bad syntax (empty event, too many separators)
    #[error("invalid hook name {name:?}: {reason}")]
    InvalidHookName {
        /// The name as given by the caller
        name: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// A hook handler failed (surfaced only in strict dispatch)
    #[error("hook handler {owner:?} failed: {message}")]
    Handler {
        /// Owner of the failing handler
        owner: String,
        /// Failure message
        message: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parsing error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Error returned by a hook handler
///
/// Handlers report failures as plain messages; the dispatcher attaches the
/// owner when it logs or surfaces them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    /// Create a hook error from anything displayable
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<Error> for HookError {
    fn from(err: Error) -> Self {
        Self(err.to_string())
    }
}
