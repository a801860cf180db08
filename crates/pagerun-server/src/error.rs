//! Error types for the HTTP server.
//!
//! Request-level failures are mapped to JSON bodies directly in the handlers;
//! this type only covers failures of the server itself (binding, accepting,
//! serving), which is why the taxonomy is small.

use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Server configuration error (bad bind address, failed bind)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_their_context_in_display() {
        let err = ServerError::config_error("Failed to bind to 127.0.0.1:4000");
        assert_eq!(
            err.to_string(),
            "Configuration error: Failed to bind to 127.0.0.1:4000"
        );

        let err = ServerError::internal("Server error: connection reset");
        assert!(err.to_string().starts_with("Internal server error:"));
    }
}
