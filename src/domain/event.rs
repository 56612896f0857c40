//! Events emitted to the UI layer.

use tokio::sync::mpsc;

use crate::domain::item::{FetchResult, Payload, PreviewTarget};
use crate::provider::ProviderError;
use crate::state::LedgerEntry;

/// Event sent from the scheduler side back to whoever renders it.
#[derive(Debug)]
pub enum DrainEvent {
    /// A tab was fetched successfully.
    Result(FetchResult),
    /// The progress message changed. Empty when idle.
    Progress(String),
    /// The "fetching" flag changed.
    Fetching(bool),
    /// The error ledger changed; carries its full contents.
    ErrorsChanged(Vec<LedgerEntry>),
    /// An on-demand preview load settled.
    Preview {
        target: PreviewTarget,
        outcome: Result<Payload, ProviderError>,
    },
}

/// Sending half for [`DrainEvent`]s.
///
/// Emission never blocks and never fails: with no listener (or a dropped
/// one) events are discarded.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<DrainEvent>>,
}

impl EventSink {
    /// Create a sink and the receiver the UI reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DrainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink with nobody listening.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: DrainEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::TabRef;

    #[test]
    fn test_sink_delivers_events() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(DrainEvent::Progress("waiting".to_string()));
        sink.emit(DrainEvent::Fetching(true));

        assert!(matches!(rx.try_recv(), Ok(DrainEvent::Progress(msg)) if msg == "waiting"));
        assert!(matches!(rx.try_recv(), Ok(DrainEvent::Fetching(true))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_detached_sink_discards() {
        let sink = EventSink::detached();
        sink.emit(DrainEvent::Result(FetchResult {
            item: TabRef::new("t1", "Dump"),
            payload: Payload::FullContent(serde_json::json!({})),
            region_key: "Standard".to_string(),
        }));
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(DrainEvent::Progress(String::new()));
    }
}
