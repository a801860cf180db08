//! Request orchestration: validate, acquire, execute, release, respond.
//!
//! The per-request state machine is `Idle → SessionAcquired → Executing →
//! {Succeeded, Failed} → SessionReleased → Responded`. No branch skips the
//! release: the session is torn down after success, after a payload failure,
//! after a watchdog expiry and after a partial acquisition alike.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::BrowserSettings;
use crate::errors::CoreError;
use crate::session::SessionManager;

pub mod scope;

/// Margin added on top of the session timeout for the wall-clock watchdog, so
/// the CDP-level timeout gets the first chance to fire with a better message.
const WATCHDOG_MARGIN: Duration = Duration::from_secs(2);

/// A validated execution request.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub code: String,
    pub received_at: DateTime<Utc>,
}

impl ExecutionRequest {
    /// Reject empty and whitespace-only payloads before any session exists.
    pub fn new(code: &str) -> Result<Self, CoreError> {
        if code.trim().is_empty() {
            return Err(CoreError::Validation("No code provided".to_string()));
        }
        Ok(Self {
            code: code.to_string(),
            received_at: Utc::now(),
        })
    }
}

/// Successful outcome of one execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub value: Value,
}

/// Runs payloads in ephemeral browser sessions.
#[derive(Debug, Clone)]
pub struct Executor {
    sessions: SessionManager,
    timeout: Duration,
}

impl Executor {
    pub fn new(settings: &BrowserSettings) -> Self {
        Self {
            sessions: SessionManager::new(settings.timeout),
            timeout: settings.timeout,
        }
    }

    /// Execute one payload and return its produced value.
    ///
    /// The in-page CDP timeouts bound automation operations; the additional
    /// wall-clock watchdog here also catches payloads that spin the page's
    /// isolate on pure computation. Either way the session is released before
    /// this function returns.
    pub async fn execute(&self, code: &str) -> Result<Value, CoreError> {
        let request = ExecutionRequest::new(code)?;
        let session = self.sessions.acquire().await?;
        let session_id = session.id();
        log::debug!("session {}: executing payload", session_id);

        let deadline = self.timeout + WATCHDOG_MARGIN;
        let outcome = match tokio::time::timeout(deadline, scope::run(&request.code, &session)).await
        {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "session {}: execution exceeded {}ms, killing session",
                    session_id,
                    deadline.as_millis()
                );
                Err(CoreError::execution(
                    format!("execution timed out after {}ms", deadline.as_millis()),
                    "",
                ))
            }
        };

        self.sessions.release(session).await;

        match outcome {
            Ok(result) => {
                log::debug!("session {}: succeeded", session_id);
                Ok(result.value)
            }
            Err(e) => {
                log::debug!("session {}: failed: {}", session_id, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_rejected_before_any_session_work() {
        for code in ["", "   ", "\n\t  \n"] {
            let err = ExecutionRequest::new(code).unwrap_err();
            match err {
                CoreError::Validation(msg) => assert_eq!(msg, "No code provided"),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn payload_text_is_preserved_verbatim() {
        let request = ExecutionRequest::new("  return 1;  ").unwrap();
        assert_eq!(request.code, "  return 1;  ");
    }

    #[tokio::test]
    async fn executor_rejects_empty_code_without_launching() {
        // No browser is available in the test environment; reaching acquire
        // would fail with a launch error, not a validation error.
        let executor = Executor::new(&BrowserSettings::default());
        let err = executor.execute("   ").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
