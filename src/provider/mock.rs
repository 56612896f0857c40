//! Scripted in-memory provider for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::Instant;

use super::{ItemError, ProviderError, TabProvider};
use crate::domain::FetchMode;

/// Scripted response for one tab id.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Content(Value),
    ItemError(String),
    Network(String),
    Malformed(String),
}

/// A call the mock received.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub id: String,
    pub region_key: String,
    pub mode: FetchMode,
    pub at: Instant,
}

/// Provider that answers from a script and records every call.
///
/// Unscripted ids succeed with `{"id": .., "region": .., "mode": ..}`.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    script: Arc<Mutex<HashMap<String, MockOutcome>>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
    latency: Duration,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(&self, id: impl Into<String>, outcome: MockOutcome) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.into(), outcome);
    }

    pub fn respond_item_error(&self, id: impl Into<String>, message: impl Into<String>) {
        self.script(id, MockOutcome::ItemError(message.into()));
    }

    pub fn respond_network_error(&self, id: impl Into<String>, message: impl Into<String>) {
        self.script(id, MockOutcome::Network(message.into()));
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn called_ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.id).collect()
    }

    async fn answer(&self, id: &str, region_key: &str, mode: FetchMode) -> Result<Value, ProviderError> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(ProviderCall {
            id: id.to_string(),
            region_key: region_key.to_string(),
            mode,
            at: Instant::now(),
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = self.script.lock().unwrap_or_else(|e| e.into_inner()).get(id).cloned();
        match scripted {
            None => Ok(json!({ "id": id, "region": region_key, "mode": mode.as_str() })),
            Some(MockOutcome::Content(value)) => Ok(value),
            Some(MockOutcome::ItemError(message)) => Err(ItemError::new(id, region_key, message).into()),
            Some(MockOutcome::Network(message)) => Err(ProviderError::Network(message)),
            Some(MockOutcome::Malformed(message)) => Err(ProviderError::Malformed(message)),
        }
    }
}

#[async_trait]
impl TabProvider for MockProvider {
    async fn fetch_full_content(&self, id: &str, region_key: &str) -> Result<Value, ProviderError> {
        self.answer(id, region_key, FetchMode::FullContent).await
    }

    async fn fetch_derived_sample(&self, id: &str, region_key: &str) -> Result<Value, ProviderError> {
        self.answer(id, region_key, FetchMode::DerivedSample).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unscripted_id_succeeds() {
        let provider = MockProvider::new();
        let value = provider.fetch_full_content("A", "Standard").await.unwrap();
        assert_eq!(value["id"], "A");
        assert_eq!(value["region"], "Standard");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_item_error() {
        let provider = MockProvider::new();
        provider.respond_item_error("A", "not found");

        let err = provider.fetch_derived_sample("A", "Standard").await.unwrap_err();
        match err {
            ProviderError::Item(item) => {
                assert_eq!(item.item_id, "A");
                assert_eq!(item.message, "not found");
            }
            other => panic!("expected item error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scripted_network_error() {
        let provider = MockProvider::new();
        provider.respond_network_error("A", "connection reset");

        let err = provider.fetch_full_content("A", "Standard").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_answer() {
        let provider = MockProvider::new().with_latency(Duration::from_secs(2));
        let start = Instant::now();
        provider.fetch_full_content("A", "Standard").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn test_clones_share_call_log() {
        let provider = MockProvider::new();
        let clone = provider.clone();
        clone.script("A", MockOutcome::Content(json!({"x": 1})));
        assert_eq!(provider.script.lock().unwrap().len(), 1);
    }
}
