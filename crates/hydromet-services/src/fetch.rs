//! Single-endpoint JSON fetcher with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use hydromet_core::{NetworkError, ReqwestErrorExt, RetrySettings, UpstreamConfig};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::retry::{with_retry, RetryConfig, RetryError};

/// Fetcher errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("Request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: RetryError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    /// The transport error behind this failure, if any request was sent
    pub fn network_error(&self) -> Option<&NetworkError> {
        match self {
            FetchError::Request { source, .. } => Some(source.last_error()),
            _ => None,
        }
    }
}

/// HTTP fetcher returning raw JSON payloads
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Arc<Client>,
    retry: RetryConfig,
}

impl Fetcher {
    /// Create a fetcher with the given per-attempt timeout and retry policy
    pub fn new(timeout: Duration, retry: RetryConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hydromet/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            retry,
        })
    }

    /// Create a fetcher from loaded configuration sections
    pub fn from_config(
        upstream: &UpstreamConfig,
        retry: &RetrySettings,
    ) -> Result<Self, FetchError> {
        Self::new(
            Duration::from_secs(upstream.timeout_secs),
            RetryConfig::from(retry),
        )
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// GET `endpoint` with `params` as the query string and decode the body as JSON.
    ///
    /// Connection failures, timeouts and non-2xx statuses are retried with
    /// backoff. An invalid endpoint or an undecodable body fails at once.
    pub async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let url = Url::parse_with_params(endpoint, params).map_err(|e| {
            FetchError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })?;

        tracing::debug!("Fetching {}", url);

        with_retry(&self.retry, |_| self.get_json(url.clone()))
            .await
            .map_err(|source| FetchError::Request {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    async fn get_json(&self, url: Url) -> Result<Value, NetworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.into_network_error())?
            .error_for_status()
            .map_err(|e| e.into_network_error())?;

        response
            .json::<Value>()
            .await
            .map_err(|e| e.into_network_error())
    }
}
