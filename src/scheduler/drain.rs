//! Batch drain scheduler.
//!
//! Drains the selection queue one tab at a time:
//! 1. Snapshots the live queue
//! 2. For each tab still queued, waits for admission and calls the provider
//! 3. Emits a result, or records an item-level failure in the ledger
//! 4. Removes the tab from the queue whatever happened
//!
//! A fatal provider error stops the pass; tabs after it stay queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::domain::{DrainEvent, FetchResult, TabRef};
use crate::error::{Result, TabfetchError};
use crate::provider::{self, TabProvider};
use crate::scheduler::admission::AdmissionController;
use crate::scheduler::outcome::{FetchOutcome, classify};
use crate::state::{DrainContext, FetchTicket};

/// Configuration for the drain scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    /// Discard outcomes of fetches issued before the last context reset.
    pub drop_stale_results: bool,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            drop_stale_results: true,
        }
    }
}

/// Counts for one completed drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub fetched: usize,
    pub failed: usize,
    /// Outcomes dropped because the context was reset while in flight.
    pub discarded: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    Completed(DrainSummary),
    /// Another drain was already running; nothing was done.
    AlreadyDraining,
}

/// Clears the draining flag on every exit path, including fatal errors.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Sequential, rate-limited consumer of the selection queue.
pub struct DrainScheduler<P: TabProvider + ?Sized> {
    config: DrainConfig,
    admission: AdmissionController,
    provider: Arc<P>,
    context: DrainContext,
    draining: Arc<AtomicBool>,
}

impl<P: TabProvider + ?Sized> Clone for DrainScheduler<P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            admission: self.admission.clone(),
            provider: self.provider.clone(),
            context: self.context.clone(),
            draining: self.draining.clone(),
        }
    }
}

impl<P: TabProvider + ?Sized> DrainScheduler<P> {
    pub fn new(provider: Arc<P>, admission: AdmissionController, context: DrainContext) -> Self {
        Self {
            config: DrainConfig::default(),
            admission,
            provider,
            context,
            draining: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: DrainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn context(&self) -> &DrainContext {
        &self.context
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Drain the queue to empty.
    ///
    /// Returns `AlreadyDraining` immediately if a drain is in progress on
    /// this scheduler or any of its clones.
    pub async fn drain(&self) -> Result<DrainStatus> {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            tracing::debug!("Drain requested while already draining");
            return Ok(DrainStatus::AlreadyDraining);
        };

        let mut summary = DrainSummary::default();

        loop {
            let snapshot = self.context.queue_snapshot();
            if snapshot.is_empty() {
                break;
            }

            tracing::info!(count = snapshot.len(), region = %self.context.region_key(), "Draining selection queue");
            self.admission.progress().set(format!("Loading {} tabs", snapshot.len()));

            for item in snapshot {
                // Deselected since the snapshot was taken
                if !self.context.is_queued(&item.id) {
                    continue;
                }
                self.fetch_one(item, &mut summary).await?;
            }
        }

        self.admission.progress().clear();
        tracing::info!(
            fetched = summary.fetched,
            failed = summary.failed,
            discarded = summary.discarded,
            "Drain complete"
        );
        Ok(DrainStatus::Completed(summary))
    }

    async fn fetch_one(&self, item: TabRef, summary: &mut DrainSummary) -> Result<()> {
        let progress = self.admission.progress();
        progress.set_fetching(true);

        let ticket = self.context.ticket();
        let source = self.provider.as_ref();
        let (id, mode, region_key) = (item.id.as_str(), ticket.mode, ticket.region_key.as_str());

        tracing::debug!(item_id = %id, mode = %mode, region = %region_key, "Fetching tab");
        let fetched = self
            .admission
            .run(move || async move { provider::fetch(source, mode, id, region_key).await })
            .await;

        let stale = self.config.drop_stale_results && self.context.is_stale(&ticket);
        let routed = match fetched {
            Ok(_) | Err(provider::ProviderError::Item(_)) if stale => {
                tracing::info!(item_id = %item.id, region = %ticket.region_key, "Discarding stale fetch outcome");
                summary.discarded += 1;
                Ok(())
            }
            Ok(payload) => {
                self.context.sink().emit(DrainEvent::Result(FetchResult {
                    item: item.clone(),
                    payload,
                    region_key: ticket.region_key.clone(),
                }));
                summary.fetched += 1;
                Ok(())
            }
            Err(err) => match classify(err) {
                FetchOutcome::ItemError { message } => {
                    tracing::warn!(item_id = %item.id, message = %message, "Tab fetch failed");
                    self.context.record_error(item.clone(), message);
                    summary.failed += 1;
                    Ok(())
                }
                FetchOutcome::Fatal(err) => {
                    tracing::error!(item_id = %item.id, error = %err, "Fatal fetch error, aborting drain");
                    Err(TabfetchError::Fatal(err))
                }
            },
        };

        self.settle(&item, &ticket);
        progress.set_fetching(false);
        progress.clear();

        routed
    }

    fn settle(&self, item: &TabRef, ticket: &FetchTicket) {
        if self.config.drop_stale_results {
            self.context.complete(&item.id, ticket);
        } else {
            self.context.deselect(&item.id);
        }
    }
}

impl<P: TabProvider + ?Sized + 'static> DrainScheduler<P> {
    /// Spawn [`drain`](Self::drain) on the runtime.
    pub fn start(&self) -> JoinHandle<Result<DrainStatus>> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.drain().await })
    }
}
