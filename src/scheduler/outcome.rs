//! Split provider failures into per-tab errors and batch-fatal errors.

use crate::provider::ProviderError;

/// How a failed fetch is handled.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The tab itself is unusable; record it and keep going.
    ItemError { message: String },
    /// Anything else; the drain pass stops and the error propagates.
    Fatal(ProviderError),
}

/// Only errors carrying the item-level shape are recoverable.
pub fn classify(err: ProviderError) -> FetchOutcome {
    match err {
        ProviderError::Item(item) => FetchOutcome::ItemError { message: item.message },
        other => FetchOutcome::Fatal(other),
    }
}
