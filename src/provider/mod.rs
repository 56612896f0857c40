//! Remote tab provider contract.
//!
//! The provider fetches one tab's full content or a derived sample given a
//! tab id and a league (region) key. Everything behind this trait (HTTP,
//! parsing, pricing) is the provider's business; the scheduler only decides
//! when a call may be issued and routes its outcome.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{FetchMode, Payload};

pub use http::{HttpProvider, ProviderConfig};
pub use mock::{MockOutcome, MockProvider, ProviderCall};

/// Source of tab data.
#[async_trait]
pub trait TabProvider: Send + Sync {
    /// Fetch the full content of one tab.
    async fn fetch_full_content(&self, id: &str, region_key: &str) -> Result<Value, ProviderError>;

    /// Fetch a derived sample for one tab.
    async fn fetch_derived_sample(&self, id: &str, region_key: &str) -> Result<Value, ProviderError>;
}

/// Dispatch on `mode` and tag the returned value.
pub async fn fetch<P>(provider: &P, mode: FetchMode, id: &str, region_key: &str) -> Result<Payload, ProviderError>
where
    P: TabProvider + ?Sized,
{
    match mode {
        FetchMode::FullContent => provider.fetch_full_content(id, region_key).await.map(Payload::FullContent),
        FetchMode::DerivedSample => provider
            .fetch_derived_sample(id, region_key)
            .await
            .map(Payload::DerivedSample),
    }
}

/// A failure specific to one tab: bad id, league mismatch, upstream per-tab fault.
///
/// Wire shape: `{ "itemId", "regionKey", "message", "kind": "itemError" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename = "itemError", rename_all = "camelCase")]
#[error("{message} (tab {item_id} in {region_key})")]
pub struct ItemError {
    pub item_id: String,
    pub region_key: String,
    pub message: String,
}

impl ItemError {
    pub fn new(item_id: impl Into<String>, region_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            region_key: region_key.into(),
            message: message.into(),
        }
    }

    /// Recognize the item-level error shape in an arbitrary JSON value.
    ///
    /// All three string fields and the `kind` discriminant must be present.
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("kind").and_then(Value::as_str) != Some("itemError") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// Errors a provider call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Item error: {0}")]
    Item(ItemError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl From<ItemError> for ProviderError {
    fn from(err: ItemError) -> Self {
        ProviderError::Item(err)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}
