//! Live wait/cooldown state shown to the user.

use std::sync::{Arc, Mutex};

use crate::domain::{DrainEvent, EventSink};

#[derive(Debug, Default)]
struct ProgressState {
    message: String,
    fetching: bool,
}

/// Current progress message and "fetching" flag.
///
/// Clones share state. Events are emitted only on actual change.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    state: Arc<Mutex<ProgressState>>,
    sink: EventSink,
}

impl ProgressReporter {
    pub fn new(sink: EventSink) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProgressState::default())),
            sink,
        }
    }

    pub fn set(&self, message: impl Into<String>) {
        let message = message.into();
        let changed = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.message == message {
                false
            } else {
                state.message = message.clone();
                true
            }
        };
        if changed {
            self.sink.emit(DrainEvent::Progress(message));
        }
    }

    pub fn clear(&self) {
        self.set(String::new());
    }

    pub fn current(&self) -> String {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).message.clone()
    }

    pub fn set_fetching(&self, fetching: bool) {
        let changed = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let changed = state.fetching != fetching;
            state.fetching = fetching;
            changed
        };
        if changed {
            self.sink.emit(DrainEvent::Fetching(fetching));
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fetching
    }
}
