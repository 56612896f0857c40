//! Rate-limited tab fetching.
//!
//! This module provides:
//! - **RateBudget**: the two sliding-window request pools the remote API imposes.
//! - **AdmissionController**: runs an operation only once both pools have
//!   credit, reporting cooldowns through the progress message.
//! - **Classifier**: splits failures into per-tab errors and fatal errors.
//! - **DrainScheduler**: drains the selection queue one tab at a time.
//! - **PreviewLoader**: loads a single tab on demand, sharing the same budget.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tabfetch::domain::{EventSink, TabRef};
//! use tabfetch::provider::MockProvider;
//! use tabfetch::scheduler::{AdmissionConfig, AdmissionController, DrainScheduler, ProgressReporter, RateBudget};
//! use tabfetch::state::DrainContext;
//!
//! let (sink, mut events) = EventSink::channel();
//! let admission = AdmissionController::new(RateBudget::default(), ProgressReporter::new(sink.clone()), AdmissionConfig::default());
//! let context = DrainContext::new("Standard", sink);
//! context.select(TabRef::new("a1b2", "Currency"));
//!
//! let scheduler = DrainScheduler::new(Arc::new(MockProvider::new()), admission, context);
//! scheduler.drain().await?;
//! ```

mod admission;
mod budget;
mod drain;
mod outcome;
mod preview;
mod progress;

pub use admission::{AdmissionConfig, AdmissionController, Cooldown};
pub use budget::{BudgetConfig, PoolConfig, RateBudget};
pub use drain::{DrainConfig, DrainScheduler, DrainStatus, DrainSummary};
pub use outcome::{FetchOutcome, classify};
pub use preview::PreviewLoader;
pub use progress::ProgressReporter;
