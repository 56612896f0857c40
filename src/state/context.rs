//! Selection state shared between the UI and the drain scheduler.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{DrainEvent, EventSink, FetchMode, TabRef};
use crate::state::ledger::{ErrorLedger, LedgerEntry};
use crate::state::queue::SelectionQueue;

#[derive(Debug)]
struct ContextState {
    queue: SelectionQueue,
    ledger: ErrorLedger,
    mode: FetchMode,
    region_key: String,
    generation: u64,
}

/// What a fetch was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub region_key: String,
    pub mode: FetchMode,
    pub generation: u64,
}

/// Queue, ledger, fetch mode, and active league.
///
/// Clones share state. Every ledger mutation emits
/// [`DrainEvent::ErrorsChanged`] with the full ledger.
#[derive(Debug, Clone)]
pub struct DrainContext {
    state: Arc<Mutex<ContextState>>,
    sink: EventSink,
}

impl DrainContext {
    pub fn new(region_key: impl Into<String>, sink: EventSink) -> Self {
        Self {
            state: Arc::new(Mutex::new(ContextState {
                queue: SelectionQueue::new(),
                ledger: ErrorLedger::new(),
                mode: FetchMode::default(),
                region_key: region_key.into(),
                generation: 0,
            })),
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Where result and ledger events go.
    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    pub fn select(&self, item: TabRef) {
        tracing::debug!(item_id = %item.id, "Tab selected");
        self.lock().queue.insert(item);
    }

    pub fn deselect(&self, id: &str) -> bool {
        self.lock().queue.remove(id).is_some()
    }

    pub fn set_mode(&self, mode: FetchMode) {
        self.lock().mode = mode;
    }

    pub fn mode(&self) -> FetchMode {
        self.lock().mode
    }

    pub fn region_key(&self) -> String {
        self.lock().region_key.clone()
    }

    pub fn queue_snapshot(&self) -> Vec<TabRef> {
        self.lock().queue.snapshot()
    }

    pub fn is_queued(&self, id: &str) -> bool {
        self.lock().queue.contains(id)
    }

    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Capture league, mode, and generation for a fetch about to be issued.
    pub fn ticket(&self) -> FetchTicket {
        let state = self.lock();
        FetchTicket {
            region_key: state.region_key.clone(),
            mode: state.mode,
            generation: state.generation,
        }
    }

    /// Whether the context was reset since `ticket` was issued.
    pub fn is_stale(&self, ticket: &FetchTicket) -> bool {
        self.lock().generation != ticket.generation
    }

    /// Remove a settled tab from the queue, unless the context moved on.
    pub fn complete(&self, id: &str, ticket: &FetchTicket) -> bool {
        let mut state = self.lock();
        if state.generation != ticket.generation {
            return false;
        }
        state.queue.remove(id).is_some()
    }

    pub fn record_error(&self, item: TabRef, message: impl Into<String>) {
        let entries = {
            let mut state = self.lock();
            state.ledger.record(item, message);
            state.ledger.entries().to_vec()
        };
        self.sink.emit(DrainEvent::ErrorsChanged(entries));
    }

    pub fn dismiss_error(&self, id: &str) {
        let entries = {
            let mut state = self.lock();
            if state.ledger.remove(id) == 0 {
                return;
            }
            state.ledger.entries().to_vec()
        };
        self.sink.emit(DrainEvent::ErrorsChanged(entries));
    }

    pub fn clear_errors(&self) {
        {
            let mut state = self.lock();
            if state.ledger.is_empty() {
                return;
            }
            state.ledger.clear();
        }
        self.sink.emit(DrainEvent::ErrorsChanged(Vec::new()));
    }

    pub fn errors(&self) -> Vec<LedgerEntry> {
        self.lock().ledger.entries().to_vec()
    }

    /// Switch league: empty the queue and the ledger.
    ///
    /// Fetches already in flight are not cancelled; their tickets go stale.
    pub fn reset(&self, region_key: impl Into<String>) {
        let region_key = region_key.into();
        let had_errors = {
            let mut state = self.lock();
            state.queue.clear();
            let had_errors = !state.ledger.is_empty();
            state.ledger.clear();
            state.region_key = region_key.clone();
            state.generation += 1;
            had_errors
        };
        tracing::info!(region = %region_key, "Selection context reset");
        if had_errors {
            self.sink.emit(DrainEvent::ErrorsChanged(Vec::new()));
        }
    }
}
