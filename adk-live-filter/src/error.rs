//! Error types for the live filter.

use thiserror::Error;

/// Result type for live filter operations.
pub type Result<T> = std::result::Result<T, LiveFilterError>;

/// Errors that can occur while driving a live session.
#[derive(Error, Debug)]
pub enum LiveFilterError {
    /// Session not connected.
    #[error("Session not connected")]
    NotConnected,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A capability declaration violates its schema invariants.
    #[error("Invalid capability schema: {0}")]
    SchemaError(String),

    /// A message could not be delivered to the session.
    #[error("Send error: {0}")]
    SendError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl LiveFilterError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Create a new send error.
    pub fn send<S: Into<String>>(msg: S) -> Self {
        Self::SendError(msg.into())
    }

    /// Create a new provider error.
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::ProviderError(msg.into())
    }
}

/// A tool call argument that could not be read as the expected type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// The argument was not present in the invocation.
    #[error("missing argument `{field}`")]
    Missing {
        /// Argument name.
        field: String,
    },

    /// The argument was present with a different JSON type.
    #[error("argument `{field}` expected {expected}, got {actual}")]
    WrongType {
        /// Argument name.
        field: String,
        /// Expected JSON type.
        expected: &'static str,
        /// Actual JSON type.
        actual: &'static str,
    },
}

impl ArgumentError {
    /// Name of the offending argument.
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { field } | Self::WrongType { field, .. } => field,
        }
    }
}
