//! Handler traits bridging the HTTP surface to the execution core.
//!
//! The router is generic over these seams so tests can drive it with mocks
//! and production wires it to the real executor and keyword extractor.

use async_trait::async_trait;
use pagerun_core::{CoreError, Executor, KeywordExtractor};
use serde_json::Value;

/// Runs one untrusted payload and returns its produced value.
#[async_trait]
pub trait ExecuteHandler: Send + Sync + Clone + 'static {
    async fn execute(&self, code: &str) -> Result<Value, CoreError>;
}

/// Extracts keywords from free text.
#[async_trait]
pub trait KeywordHandler: Send + Sync + Clone + 'static {
    async fn keywords(&self, text: &str) -> Result<Vec<String>, CoreError>;
}

#[async_trait]
impl ExecuteHandler for Executor {
    async fn execute(&self, code: &str) -> Result<Value, CoreError> {
        Executor::execute(self, code).await
    }
}

#[async_trait]
impl KeywordHandler for KeywordExtractor {
    async fn keywords(&self, text: &str) -> Result<Vec<String>, CoreError> {
        self.extract(text).await
    }
}
