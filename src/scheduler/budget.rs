//! Request budget for the remote tab API.
//!
//! The API enforces two limits at once: 30 requests per 5 minutes and 15
//! requests per 10 seconds. Each pool is a sliding window: a consumed credit
//! comes back exactly `window` after it was taken, so no rolling interval of
//! `window` ever sees more than `capacity` requests.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{Result, TabfetchError};

/// Size of one credit pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub capacity: usize,
    pub window_ms: u64,
}

impl PoolConfig {
    pub fn new(capacity: usize, window_ms: u64) -> Self {
        Self { capacity, window_ms }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Both pools of the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub long: PoolConfig,
    pub short: PoolConfig,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            long: PoolConfig::new(30, 300_000),
            short: PoolConfig::new(15, 10_000),
        }
    }
}

impl BudgetConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, pool) in [("long", self.long), ("short", self.short)] {
            if pool.capacity == 0 {
                return Err(TabfetchError::Config(format!("{} window capacity must be positive", name)));
            }
            if pool.window_ms == 0 {
                return Err(TabfetchError::Config(format!("{} window length must be positive", name)));
            }
        }
        Ok(())
    }
}

/// One pool: timestamps of the credits currently in their cooldown window.
#[derive(Debug)]
struct Pool {
    capacity: usize,
    window: Duration,
    taken: VecDeque<Instant>,
}

impl Pool {
    fn new(config: PoolConfig) -> Self {
        Self {
            capacity: config.capacity,
            window: config.window(),
            taken: VecDeque::with_capacity(config.capacity),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.taken.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.taken.pop_front();
            } else {
                break;
            }
        }
    }

    fn remaining(&self) -> usize {
        self.capacity - self.taken.len()
    }

    fn next_credit_in(&self, now: Instant) -> Option<Duration> {
        if self.remaining() > 0 {
            return None;
        }
        self.taken
            .front()
            .map(|&oldest| (oldest + self.window).saturating_duration_since(now))
    }
}

/// The two request pools shared by every consumer of the API.
#[derive(Debug)]
pub struct RateBudget {
    long: Pool,
    short: Pool,
}

impl RateBudget {
    /// Create a budget with both pools full.
    pub fn new(config: BudgetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            long: Pool::new(config.long),
            short: Pool::new(config.short),
        })
    }

    /// Take one credit from each pool if both have one.
    ///
    /// The check and the decrement happen in the same `&mut self` call.
    pub fn try_consume(&mut self) -> bool {
        let now = Instant::now();
        self.prune(now);

        if self.long.remaining() == 0 || self.short.remaining() == 0 {
            return false;
        }

        self.long.taken.push_back(now);
        self.short.taken.push_back(now);

        tracing::trace!(
            remaining_long = self.long.remaining(),
            remaining_short = self.short.remaining(),
            "Consumed request credit"
        );
        true
    }

    /// Whether both pools have a credit right now.
    pub fn has_capacity(&mut self) -> bool {
        self.prune(Instant::now());
        self.long.remaining() > 0 && self.short.remaining() > 0
    }

    pub fn remaining_long(&mut self) -> usize {
        self.prune(Instant::now());
        self.long.remaining()
    }

    pub fn remaining_short(&mut self) -> usize {
        self.prune(Instant::now());
        self.short.remaining()
    }

    /// Credits of the long pool still in their cooldown window.
    pub fn outstanding_long(&mut self) -> usize {
        self.prune(Instant::now());
        self.long.taken.len()
    }

    /// Credits of the short pool still in their cooldown window.
    pub fn outstanding_short(&mut self) -> usize {
        self.prune(Instant::now());
        self.short.taken.len()
    }

    pub fn long_capacity(&self) -> usize {
        self.long.capacity
    }

    pub fn short_capacity(&self) -> usize {
        self.short.capacity
    }

    /// Time until the long pool gets a credit back, if it is empty.
    pub fn next_long_credit_in(&mut self) -> Option<Duration> {
        let now = Instant::now();
        self.prune(now);
        self.long.next_credit_in(now)
    }

    /// Time until the short pool gets a credit back, if it is empty.
    pub fn next_short_credit_in(&mut self) -> Option<Duration> {
        let now = Instant::now();
        self.prune(now);
        self.short.next_credit_in(now)
    }

    fn prune(&mut self, now: Instant) {
        self.long.prune(now);
        self.short.prune(now);
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self {
            long: Pool::new(BudgetConfig::default().long),
            short: Pool::new(BudgetConfig::default().short),
        }
    }
}
