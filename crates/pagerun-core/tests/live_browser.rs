//! End-to-end tests against a real Chromium.
//!
//! Ignored by default: they need a local Chrome/Chromium binary on PATH. Run
//! with `cargo test -p pagerun-core -- --ignored` on a machine that has one.

use std::time::Duration;

use pagerun_core::config::BrowserSettings;
use pagerun_core::{CoreError, Executor};

fn executor(timeout: Duration) -> Executor {
    Executor::new(&BrowserSettings { timeout })
}

#[tokio::test]
#[ignore]
async fn payload_return_value_round_trips() {
    let value = executor(Duration::from_secs(60))
        .execute("return { answer: 6 * 7, tags: ['a', 'b'] };")
        .await
        .unwrap();
    assert_eq!(value["answer"], 42);
    assert_eq!(value["tags"][1], "b");
}

#[tokio::test]
#[ignore]
async fn thrown_error_carries_message_and_trace() {
    let err = executor(Duration::from_secs(60))
        .execute("throw new Error('boom');")
        .await
        .unwrap_err();
    match err {
        CoreError::Execution { message, trace } => {
            assert_eq!(message, "boom");
            assert!(!trace.trim().is_empty());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
#[ignore]
async fn sessions_do_not_share_state() {
    let executor = executor(Duration::from_secs(60));
    executor
        .execute("globalThis.leak = 'from-request-a'; return true;")
        .await
        .unwrap();
    let value = executor
        .execute("return typeof globalThis.leak;")
        .await
        .unwrap();
    assert_eq!(value, "undefined");
}

#[tokio::test]
#[ignore]
async fn overlong_payload_resolves_instead_of_hanging() {
    let err = executor(Duration::from_secs(2))
        .execute("await driver.sleep(60000); return 'unreachable';")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Execution { .. }));
}

#[tokio::test]
#[ignore]
async fn logger_capability_is_callable() {
    let value = executor(Duration::from_secs(60))
        .execute("logger.info('hello from payload'); return session.timeoutMs;")
        .await
        .unwrap();
    assert_eq!(value, 60_000);
}
