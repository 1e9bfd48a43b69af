//! Dify workflow API client.
//!
//! Sends the assembled race text to a workflow and streams the generated
//! prediction back.

pub mod error;
pub mod streaming;

pub use error::{DifyError, Result};
pub use streaming::DifyStream;

use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DifyConfig;

/// Workflow run request body
#[derive(Debug, Serialize)]
struct WorkflowRequest<'a> {
    inputs: WorkflowInputs<'a>,
    response_mode: &'static str,
    user: &'a str,
}

#[derive(Debug, Serialize)]
struct WorkflowInputs<'a> {
    text: &'a str,
}

/// Dify API client.
#[derive(Clone)]
pub struct DifyClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    user: String,
}

impl DifyClient {
    /// Build a client from config; fails without an API key.
    pub fn from_config(config: &DifyConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DifyError::Config("dify.api_key not set (UMAI_DIFY__API_KEY)".into()))?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DifyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
        })
    }

    /// Run the workflow in streaming mode.
    pub async fn run_workflow_stream(&self, text: &str) -> Result<DifyStream> {
        use reqwest::header;

        let body = WorkflowRequest {
            inputs: WorkflowInputs { text },
            response_mode: "streaming",
            user: &self.user,
        };

        debug!(chars = text.chars().count(), "Starting Dify workflow run");
        let response = self
            .http_client
            .post(format!("{}/v1/workflows/run", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Dify workflow request failed");
                DifyError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Dify workflow API error");
            return Err(DifyError::Api(format!("{}: {}", status, error_text)));
        }

        Ok(DifyStream::new(response.bytes_stream()))
    }

    /// Run the workflow and pass each chunk to `on_chunk`; returns the full text.
    pub async fn run_workflow<F>(&self, text: &str, mut on_chunk: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let mut stream = self.run_workflow_stream(text).await?;
        let mut output = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            on_chunk(&chunk);
            output.push_str(&chunk);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let config = DifyConfig::default();
        assert!(matches!(
            DifyClient::from_config(&config),
            Err(DifyError::Config(_))
        ));
    }

    #[test]
    fn test_request_body() {
        let body = WorkflowRequest {
            inputs: WorkflowInputs { text: "■レース情報" },
            response_mode: "streaming",
            user: "keiba-bot",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inputs": {"text": "■レース情報"},
                "response_mode": "streaming",
                "user": "keiba-bot"
            })
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = DifyConfig {
            api_key: Some("app-test".to_string()),
            base_url: "https://dify.example.com/".to_string(),
            ..Default::default()
        };
        let client = DifyClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://dify.example.com");
    }
}
