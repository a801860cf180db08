//! Error types for the execution service core.
//!
//! Every failure a request can hit is funnelled into a single taxonomy so the
//! HTTP layer can map variants onto status codes without inspecting message
//! strings. Teardown failures are deliberately absent: the session manager
//! swallows them so the primary error is the one a caller sees.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("{message}")]
    Execution { message: String, trace: String },
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl CoreError {
    /// Build an execution error from a payload failure, guaranteeing a
    /// non-empty trace even when the engine supplied none.
    pub fn execution(message: impl Into<String>, trace: impl Into<String>) -> Self {
        let message = message.into();
        let trace = trace.into();
        let trace = if trace.trim().is_empty() {
            message.clone()
        } else {
            trace
        };
        CoreError::Execution { message, trace }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_error_backfills_empty_trace() {
        let err = CoreError::execution("boom", "");
        match err {
            CoreError::Execution { message, trace } => {
                assert_eq!(message, "boom");
                assert_eq!(trace, "boom");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn execution_error_keeps_provided_trace() {
        let err = CoreError::execution("boom", "Error: boom\n    at <anonymous>:1:1");
        match err {
            CoreError::Execution { trace, .. } => {
                assert!(trace.contains("at <anonymous>"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
