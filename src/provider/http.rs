//! HTTP implementation of [`TabProvider`] backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ItemError, ProviderError, TabProvider};
use crate::error::{Result, TabfetchError};

/// Default API base URL
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8650/stash";

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("tabfetch/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the remote tab API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Environment variable holding a bearer token, if the API needs one
    pub token_env: Option<String>,
    /// Request timeout; requests run until the server answers when unset
    pub timeout_ms: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            token_env: None,
            timeout_ms: None,
        }
    }
}

/// Remote tab API client
pub struct HttpProvider {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpProvider {
    /// Create a provider, reading the bearer token from `token_env` if set
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let token = match &config.token_env {
            Some(var) => Some(
                std::env::var(var).map_err(|_| TabfetchError::Config(format!("{} not set", var)))?,
            ),
            None => None,
        };

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| TabfetchError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn content_url(&self, id: &str, region_key: &str) -> String {
        format!("{}/{}/{}", self.base_url, region_key, id)
    }

    fn sample_url(&self, id: &str, region_key: &str) -> String {
        format!("{}/sample", self.content_url(id, region_key))
    }

    async fn get_json(&self, url: &str) -> std::result::Result<Value, ProviderError> {
        tracing::debug!(url = %url, "GET");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()));
        }

        Err(classify_failure(status, &body))
    }
}

/// Map a non-2xx response to a provider error.
fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    if let Some(item) = serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(ItemError::from_value)
    {
        return ProviderError::Item(item);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(body.to_string()),
        _ => ProviderError::Http {
            status: status.as_u16(),
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl TabProvider for HttpProvider {
    async fn fetch_full_content(&self, id: &str, region_key: &str) -> std::result::Result<Value, ProviderError> {
        self.get_json(&self.content_url(id, region_key)).await
    }

    async fn fetch_derived_sample(&self, id: &str, region_key: &str) -> std::result::Result<Value, ProviderError> {
        self.get_json(&self.sample_url(id, region_key)).await
    }
}
