//! uClassify topic classifier client.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use serde_json::Value as JsonValue;

use crate::application::tagging::{ClassifierError, TopicClassifier};
use crate::config::TaggingSettings;

pub const DEFAULT_ENDPOINT: &str = "https://api.uclassify.com/v1/uclassify/topics/classify";

#[derive(Clone, Debug)]
pub struct UclassifyClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl UclassifyClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(|err| ClassifierError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// A client for the configured key, or `None` when tagging is not configured.
    pub fn from_settings(settings: &TaggingSettings) -> Result<Option<Self>, ClassifierError> {
        match settings.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {
                Self::new(settings.endpoint.clone(), key.trim()).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn user_agent() -> &'static str {
        concat!("wiki/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl TopicClassifier for UclassifyClient {
    async fn classify(&self, body: Bytes) -> Result<JsonValue, ClassifierError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Token {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| ClassifierError::Transport(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClassifierError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|err| ClassifierError::Decode(err.to_string()))
    }
}
