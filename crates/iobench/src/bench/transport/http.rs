//! HTTP transport on `reqwest`

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::bench::config::BenchConfig;
use crate::bench::core::{BenchError, OperationKind, Result};
use crate::bench::transport::Transport;

/// Issues GET requests through one pooled client
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create an HTTP transport from benchmark configuration
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        Self::with_config(config.request_timeout, &config.user_agent)
    }

    /// Create an HTTP transport with custom timeout and user agent
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| BenchError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                field: Some("request_timeout".to_string()),
            })?;

        Ok(Self { client, timeout })
    }

    fn map_error(&self, url: &str, error: reqwest::Error) -> BenchError {
        if error.is_timeout() {
            BenchError::RequestTimeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            BenchError::HttpRequest {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn supports(&self, kind: OperationKind) -> bool {
        kind == OperationKind::Request
    }

    async fn get(&self, url: &str) -> Result<u16> {
        let parsed = url::Url::parse(url).map_err(|e| BenchError::InvalidUrl {
            url: url.to_string(),
            source: e,
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;
        let status = response.status().as_u16();

        // Drain the body so the connection goes back to the pool
        let body = response.bytes().await.map_err(|e| self.map_error(url, e))?;
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(status)
    }
}
