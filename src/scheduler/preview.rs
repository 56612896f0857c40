//! On-demand loading of a single tab outside the batch.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{DrainEvent, EventSink, FetchMode, Payload, PreviewTarget};
use crate::provider::{self, ProviderError, TabProvider};
use crate::scheduler::admission::AdmissionController;

/// Loads the tab the user opened for inspection.
///
/// Shares its [`AdmissionController`] with the drain scheduler, so previews
/// and batch fetches draw from the same budget.
pub struct PreviewLoader<P: TabProvider + ?Sized> {
    admission: AdmissionController,
    provider: Arc<P>,
    sink: EventSink,
}

impl<P: TabProvider + ?Sized> Clone for PreviewLoader<P> {
    fn clone(&self) -> Self {
        Self {
            admission: self.admission.clone(),
            provider: self.provider.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<P: TabProvider + ?Sized> PreviewLoader<P> {
    pub fn new(provider: Arc<P>, admission: AdmissionController, sink: EventSink) -> Self {
        Self {
            admission,
            provider,
            sink,
        }
    }

    pub async fn load_one(&self, id: &str, region_key: &str, mode: FetchMode) -> Result<Payload, ProviderError> {
        let source = self.provider.as_ref();
        tracing::debug!(item_id = %id, mode = %mode, region = %region_key, "Loading preview");
        self.admission
            .run(move || async move { provider::fetch(source, mode, id, region_key).await })
            .await
    }
}

impl<P: TabProvider + ?Sized + 'static> PreviewLoader<P> {
    /// Load every target published on `targets` and emit [`DrainEvent::Preview`].
    ///
    /// Superseded loads are not cancelled; each one still emits when it
    /// settles. The task ends when the sender is dropped.
    pub fn follow(&self, mut targets: watch::Receiver<Option<PreviewTarget>>) -> JoinHandle<()> {
        let loader = self.clone();
        tokio::spawn(async move {
            loop {
                let target = targets.borrow_and_update().clone();
                if let Some(target) = target {
                    let loader = loader.clone();
                    tokio::spawn(async move {
                        let outcome = loader
                            .load_one(&target.item.id, &target.region_key, target.mode)
                            .await;
                        if let Err(err) = &outcome {
                            tracing::warn!(item_id = %target.item.id, error = %err, "Preview load failed");
                        }
                        loader.sink.emit(DrainEvent::Preview { target, outcome });
                    });
                }
                if targets.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
