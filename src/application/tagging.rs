//! Topic suggestions for page content, delegated to an external classifier.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Transport(String),
    #[error("classifier responded with status {status}")]
    Status { status: u16 },
    #[error("classifier response is not valid JSON: {0}")]
    Decode(String),
}

/// Forwards a classification request body and returns the classifier's
/// JSON answer unchanged.
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    async fn classify(&self, body: Bytes) -> Result<JsonValue, ClassifierError>;
}
