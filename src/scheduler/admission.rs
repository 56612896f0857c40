//! Admission control: run an operation only once the budget allows it.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scheduler::budget::RateBudget;
use crate::scheduler::progress::ProgressReporter;

/// Poll intervals while waiting for a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Re-check interval while the long window is exhausted (ms).
    pub long_poll_ms: u64,
    /// Re-check interval while the short window is exhausted (ms).
    pub short_poll_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            long_poll_ms: 1000,
            short_poll_ms: 500,
        }
    }
}

/// Which pool is holding a caller back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    Long(Duration),
    Short(Duration),
}

impl Cooldown {
    pub fn notice(&self) -> String {
        match self {
            Cooldown::Long(wait) => format!("Long rate limit reached, waiting {}s for cooldown", ceil_secs(*wait)),
            Cooldown::Short(wait) => format!("Short rate limit reached, waiting {}s for cooldown", ceil_secs(*wait)),
        }
    }
}

fn ceil_secs(d: Duration) -> u128 {
    d.as_millis().div_ceil(1000)
}

/// Gate in front of every provider call.
///
/// Clones share the budget and the progress reporter, so the batch scheduler
/// and the preview loader compete for the same credits.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    budget: Arc<Mutex<RateBudget>>,
    progress: ProgressReporter,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(budget: RateBudget, progress: ProgressReporter, config: AdmissionConfig) -> Self {
        Self {
            budget: Arc::new(Mutex::new(budget)),
            progress,
            config,
        }
    }

    /// Shared handle to the underlying budget.
    pub fn budget(&self) -> Arc<Mutex<RateBudget>> {
        self.budget.clone()
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Wait for a credit, then run `op` and return whatever it returns.
    ///
    /// After `op` settles a background task re-runs the wait loop to clear
    /// any progress message left behind by a concurrent caller.
    pub async fn run<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.admit().await;
        let output = op().await;

        let hygiene = self.clone();
        tokio::spawn(async move {
            hygiene.wait_for_capacity().await;
        });

        output
    }

    /// Block until a credit is taken.
    async fn admit(&self) {
        loop {
            match self.try_admit() {
                None => {
                    tracing::trace!("Request admitted");
                    self.progress.clear();
                    return;
                }
                Some(cooldown) => self.wait(cooldown).await,
            }
        }
    }

    /// Block until both pools have credit, without taking one.
    pub async fn wait_for_capacity(&self) {
        while let Some(cooldown) = self.cooldown() {
            self.wait(cooldown).await;
        }
        self.progress.clear();
    }

    /// Take a credit, or report which pool is empty. One lock acquisition.
    fn try_admit(&self) -> Option<Cooldown> {
        let mut budget = self.budget.lock().unwrap_or_else(|e| e.into_inner());
        if budget.try_consume() {
            return None;
        }
        Some(current_cooldown(&mut budget))
    }

    fn cooldown(&self) -> Option<Cooldown> {
        let mut budget = self.budget.lock().unwrap_or_else(|e| e.into_inner());
        if budget.has_capacity() {
            return None;
        }
        Some(current_cooldown(&mut budget))
    }

    async fn wait(&self, cooldown: Cooldown) {
        self.progress.set(cooldown.notice());
        let poll = match cooldown {
            Cooldown::Long(_) => self.config.long_poll_ms,
            Cooldown::Short(_) => self.config.short_poll_ms,
        };
        tracing::debug!(cooldown = ?cooldown, poll_ms = poll, "Waiting for request credit");
        tokio::time::sleep(Duration::from_millis(poll)).await;
    }
}

/// Long pool takes precedence when both are empty.
fn current_cooldown(budget: &mut RateBudget) -> Cooldown {
    match budget.next_long_credit_in() {
        Some(wait) => Cooldown::Long(wait),
        None => Cooldown::Short(budget.next_short_credit_in().unwrap_or_default()),
    }
}
