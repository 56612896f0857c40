//! Per-tab failures surfaced to the user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::TabRef;

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub item: TabRef,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

/// Ordered, unbounded list of item-level failures.
///
/// No deduplication: a tab that fails twice appears twice.
#[derive(Debug, Clone, Default)]
pub struct ErrorLedger {
    entries: Vec<LedgerEntry>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, item: TabRef, message: impl Into<String>) {
        self.entries.push(LedgerEntry {
            item,
            message: message.into(),
            recorded_at: Utc::now(),
        });
    }

    /// Drop every entry for `item_id`. Returns how many were removed.
    pub fn remove(&mut self, item_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.item.id != item_id);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
