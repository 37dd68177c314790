//! Error types for the configuration module

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A generic error with a message
    #[error("Error: {0}")]
    Generic(String),

    /// An error that occurred during parsing
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The key does not name a configuration setting
    #[error("invalid key: '{0}' is not a valid configuration key.")]
    InvalidKey(String),

    /// The value cannot be stored under the key
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        /// The configuration key
        key: String,
        /// The rejected value
        value: String,
        /// Why the value was rejected
        reason: String,
    },
}
