//! Drain scheduler integration tests
//!
//! Exercise the budget, admission, drain, and preview paths together with a
//! scripted provider on tokio's paused clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tabfetch::domain::{DrainEvent, EventSink, FetchMode, FetchResult, TabRef};
use tabfetch::provider::{MockProvider, ProviderError};
use tabfetch::scheduler::{
    AdmissionConfig, AdmissionController, BudgetConfig, DrainScheduler, DrainStatus, PoolConfig, PreviewLoader,
    ProgressReporter, RateBudget,
};
use tabfetch::state::{DrainContext, LedgerEntry};
use tabfetch::TabfetchError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

struct Harness {
    provider: MockProvider,
    admission: AdmissionController,
    scheduler: DrainScheduler<MockProvider>,
    preview: PreviewLoader<MockProvider>,
    events: UnboundedReceiver<DrainEvent>,
}

impl Harness {
    fn new(budget: BudgetConfig, provider: MockProvider) -> Self {
        let (sink, events) = EventSink::channel();
        let admission = AdmissionController::new(
            RateBudget::new(budget).unwrap(),
            ProgressReporter::new(sink.clone()),
            AdmissionConfig::default(),
        );
        let provider_arc = Arc::new(provider.clone());
        let context = DrainContext::new("Standard", sink.clone());
        let scheduler = DrainScheduler::new(provider_arc.clone(), admission.clone(), context);
        let preview = PreviewLoader::new(provider_arc, admission.clone(), sink);

        Self {
            provider,
            admission,
            scheduler,
            preview,
            events,
        }
    }

    fn select(&self, ids: &[&str]) {
        for id in ids {
            self.scheduler.context().select(TabRef::new(*id, format!("Tab {}", id)));
        }
    }

    fn take_events(&mut self) -> Vec<DrainEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// Spend `n` credits through the admission gate without touching the provider.
    async fn spend(&self, n: usize) {
        for _ in 0..n {
            self.admission.run(|| async {}).await;
        }
    }
}

fn results(events: &[DrainEvent]) -> Vec<&FetchResult> {
    events
        .iter()
        .filter_map(|e| match e {
            DrainEvent::Result(r) => Some(r),
            _ => None,
        })
        .collect()
}

fn last_ledger(events: &[DrainEvent]) -> Option<&Vec<LedgerEntry>> {
    events
        .iter()
        .filter_map(|e| match e {
            DrainEvent::ErrorsChanged(entries) => Some(entries),
            _ => None,
        })
        .last()
}

/// Outstanding credits always equal the consumed credits still inside each window.
#[tokio::test(start_paused = true)]
async fn test_budget_conservation() {
    let mut budget = RateBudget::new(BudgetConfig::default()).unwrap();
    let mut issued: Vec<Instant> = Vec::new();

    // Uneven bursts spread over more than one long window
    let gaps_ms = [0u64, 50, 2_000, 0, 7_000, 400, 12_000, 60_000, 90_000, 1, 150_000];
    for (round, gap) in gaps_ms.iter().cycle().take(60).enumerate() {
        tokio::time::advance(Duration::from_millis(*gap)).await;
        for _ in 0..(round % 4 + 1) {
            if budget.try_consume() {
                issued.push(Instant::now());
            }
        }

        let now = Instant::now();
        let live_long = issued.iter().filter(|t| now - **t < Duration::from_secs(300)).count();
        let live_short = issued.iter().filter(|t| now - **t < Duration::from_secs(10)).count();

        assert_eq!(budget.outstanding_long(), live_long);
        assert_eq!(budget.outstanding_short(), live_short);
        assert_eq!(budget.long_capacity() - budget.remaining_long(), live_long);
        assert_eq!(budget.short_capacity() - budget.remaining_short(), live_short);
        assert!(budget.remaining_long() <= 30);
        assert!(budget.remaining_short() <= 15);
    }
    assert!(!issued.is_empty());
}

/// Concurrent callers never exceed either window.
#[tokio::test(start_paused = true)]
async fn test_admission_never_exceeds_windows() {
    let harness = Harness::new(BudgetConfig::default(), MockProvider::new());
    let start = Instant::now();

    let mut handles = Vec::new();
    for i in 0..40 {
        let admission = harness.admission.clone();
        handles.push(tokio::spawn(async move { admission.run(|| async move { (i, Instant::now()) }).await }));
    }
    let mut times = Vec::new();
    for handle in handles {
        times.push(handle.await.unwrap().1);
    }
    times.sort();

    for (i, t) in times.iter().enumerate() {
        let in_short = times[i..].iter().take_while(|u| **u - *t < Duration::from_secs(10)).count();
        let in_long = times[i..].iter().take_while(|u| **u - *t < Duration::from_secs(300)).count();
        assert!(in_short <= 15, "short window exceeded at {:?}", *t - start);
        assert!(in_long <= 30, "long window exceeded at {:?}", *t - start);
    }
    // The 31st call has to wait for the first long credit to return
    assert!(times[30] - start >= Duration::from_secs(300));
}

/// Every tab yields exactly one result or one ledger entry.
#[tokio::test(start_paused = true)]
async fn test_drain_completeness() {
    let provider = MockProvider::new();
    let ids: Vec<String> = (0..20).map(|i| format!("tab{:02}", i)).collect();
    for id in ids.iter().filter(|id| id.ends_with('3') || id.ends_with('7')) {
        provider.respond_item_error(id.clone(), "not found");
    }
    let mut harness = Harness::new(BudgetConfig::default(), provider);
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    harness.select(&id_refs);

    let status = harness.scheduler.drain().await.unwrap();
    let events = harness.take_events();

    let mut seen: HashMap<String, usize> = HashMap::new();
    for r in results(&events) {
        *seen.entry(r.item.id.clone()).or_default() += 1;
    }
    for entry in harness.scheduler.context().errors() {
        *seen.entry(entry.item.id.clone()).or_default() += 1;
    }

    assert_eq!(harness.scheduler.context().queue_len(), 0);
    assert_eq!(seen.len(), 20);
    assert!(seen.values().all(|n| *n == 1));
    assert!(matches!(status, DrainStatus::Completed(s) if s.fetched == 16 && s.failed == 4));
}

/// A fatal error leaves later tabs queued and reaches the caller.
#[tokio::test(start_paused = true)]
async fn test_fatal_short_circuit() {
    let provider = MockProvider::new();
    provider.respond_network_error("C", "connection reset");
    let harness = Harness::new(BudgetConfig::default(), provider);
    harness.select(&["A", "B", "C", "D", "E"]);

    let err = harness.scheduler.drain().await.unwrap_err();

    assert!(matches!(err, TabfetchError::Fatal(ProviderError::Network(_))));
    assert_eq!(harness.provider.called_ids(), vec!["A", "B", "C"]);
    let left: Vec<String> = harness
        .scheduler
        .context()
        .queue_snapshot()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(left, vec!["D", "E"]);

    // A later drain resumes with what is left
    harness.scheduler.drain().await.unwrap();
    assert_eq!(harness.provider.called_ids(), vec!["A", "B", "C", "D", "E"]);
}

/// Dismissing the same tab twice changes nothing the second time.
#[tokio::test(start_paused = true)]
async fn test_ledger_removal_idempotent() {
    let provider = MockProvider::new();
    provider.respond_item_error("A", "not found");
    provider.respond_item_error("B", "wrong league");
    let harness = Harness::new(BudgetConfig::default(), provider);
    harness.select(&["A", "B"]);
    harness.scheduler.drain().await.unwrap();

    let context = harness.scheduler.context();
    context.dismiss_error("A");
    let after_first = context.errors();
    context.dismiss_error("A");

    assert_eq!(context.errors(), after_first);
    assert_eq!(after_first.len(), 1);
    assert_eq!(after_first[0].item.id, "B");
}

/// Every fetch succeeds and results arrive in selection order.
#[tokio::test(start_paused = true)]
async fn test_scenario_all_succeed() {
    let mut harness = Harness::new(BudgetConfig::default(), MockProvider::new());
    harness.select(&["A", "B", "C"]);

    harness.scheduler.drain().await.unwrap();
    let events = harness.take_events();

    let ids: Vec<&str> = results(&events).iter().map(|r| r.item.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert!(results(&events).iter().all(|r| r.region_key == "Standard"));
    assert_eq!(harness.scheduler.context().queue_len(), 0);
    assert!(harness.scheduler.context().errors().is_empty());
    assert_eq!(harness.admission.progress().current(), "");
}

/// A per-tab failure lands in the ledger and the next tab still loads.
#[tokio::test(start_paused = true)]
async fn test_scenario_item_error_then_success() {
    let provider = MockProvider::new();
    provider.respond_item_error("A", "not found");
    let mut harness = Harness::new(BudgetConfig::default(), provider);
    harness.select(&["A", "B"]);

    harness.scheduler.drain().await.unwrap();
    let events = harness.take_events();

    let errors = harness.scheduler.context().errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].item, TabRef::new("A", "Tab A"));
    assert_eq!(errors[0].message, "not found");
    assert_eq!(last_ledger(&events).map(Vec::len), Some(1));

    let fetched = results(&events);
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].item.id, "B");
    assert_eq!(harness.scheduler.context().queue_len(), 0);
}

/// An empty long window holds the fetch until a credit returns.
#[tokio::test(start_paused = true)]
async fn test_scenario_long_cooldown() {
    let harness = Harness::new(BudgetConfig::default(), MockProvider::new());
    let start = Instant::now();
    harness.spend(30).await;
    assert_eq!(harness.admission.budget().lock().unwrap().remaining_long(), 0);

    harness.select(&["A"]);
    let handle = harness.scheduler.start();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(harness.admission.progress().current().starts_with("Long rate limit reached"));
    assert_eq!(harness.provider.call_count(), 0);

    handle.await.unwrap().unwrap();
    let calls = harness.provider.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].at - start >= Duration::from_secs(300));
    assert!(calls[0].at - start < Duration::from_secs(302));
}

/// Batch and preview race for the last short-window credit; the loser waits and says so.
#[tokio::test(start_paused = true)]
async fn test_scenario_batch_and_preview_share_budget() {
    let mut harness = Harness::new(BudgetConfig::default(), MockProvider::new());
    harness.spend(14).await;
    assert_eq!(harness.admission.budget().lock().unwrap().remaining_short(), 1);

    harness.select(&["A"]);
    let start = Instant::now();
    let (drained, previewed) = tokio::join!(
        harness.scheduler.drain(),
        harness.preview.load_one("P", "Standard", FetchMode::DerivedSample)
    );
    drained.unwrap();
    previewed.unwrap();

    let mut offsets: Vec<Duration> = harness.provider.calls().iter().map(|c| c.at - start).collect();
    offsets.sort();
    assert_eq!(offsets.len(), 2);
    assert_eq!(offsets[0], Duration::ZERO);
    assert!(offsets[1] >= Duration::from_secs(10));

    let notices: Vec<String> = harness
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            DrainEvent::Progress(message) => Some(message),
            _ => None,
        })
        .collect();
    assert!(
        notices
            .iter()
            .any(|m| m.starts_with("Short rate limit reached, waiting") && m.ends_with("s for cooldown"))
    );
    assert!(!notices.iter().any(|m| m.starts_with("Long rate limit reached")));
}

/// The short window alone paces a long batch.
#[tokio::test(start_paused = true)]
async fn test_short_window_paces_batch() {
    let budget = BudgetConfig {
        long: PoolConfig::new(100, 300_000),
        short: PoolConfig::new(2, 1_000),
    };
    let harness = Harness::new(budget, MockProvider::new());
    harness.select(&["A", "B", "C", "D", "E"]);
    let start = Instant::now();

    harness.scheduler.drain().await.unwrap();

    let offsets: Vec<u64> = harness
        .provider
        .calls()
        .iter()
        .map(|c| (c.at - start).as_secs())
        .collect();
    assert_eq!(offsets, vec![0, 0, 1, 1, 2]);
}

/// Switching league mid-drain empties bookkeeping but leaves the budget alone.
#[tokio::test(start_paused = true)]
async fn test_reset_does_not_refund_budget() {
    let provider = MockProvider::new().with_latency(Duration::from_secs(1));
    let mut harness = Harness::new(BudgetConfig::default(), provider);
    harness.select(&["A", "B", "C"]);

    let handle = harness.scheduler.start();
    tokio::time::sleep(Duration::from_millis(500)).await;
    harness.scheduler.context().reset("Hardcore");
    handle.await.unwrap().unwrap();

    assert!(results(&harness.take_events()).is_empty());
    assert_eq!(harness.provider.called_ids(), vec!["A"]);
    assert_eq!(harness.admission.budget().lock().unwrap().remaining_long(), 29);
}
