//! Core library for the pagerun remote execution service.
//!
//! pagerun accepts arbitrary source text over HTTP, runs it inside a freshly
//! launched headless Chromium session, and returns the produced value or a
//! structured error with a stack trace. This crate holds everything below the
//! HTTP surface:
//!
//! - **Session lifecycle**: one ephemeral browser-process-and-page instance
//!   per request, with guaranteed teardown on every exit path
//! - **Execution scope**: the in-page wrapper that exposes exactly four
//!   capability handles to the untrusted payload and captures its outcome
//! - **Orchestration**: the per-request state machine with timeout
//!   enforcement and a single release point
//! - **Keyword extraction**: a hosted chat-completion client behind a narrow
//!   trait
//! - **Configuration**: environment-driven, loaded once at startup

pub mod config;
pub mod errors;
pub mod exec;
pub mod llm;
pub mod session;

pub use config::ServiceConfig;
pub use errors::CoreError;
pub use exec::{ExecutionRequest, ExecutionResult, Executor};
pub use llm::{KeywordExtractor, Llm, OpenAiClient};
pub use session::{Session, SessionManager};
