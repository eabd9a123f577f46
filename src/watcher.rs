use crate::constants::{ENTRYPOINT_DEFAULT, ENTRYPOINT_MAKE_OVEN};
use crate::error::Result;
use crate::models::{ContractKind, Network, Operation};
use crate::services::formatter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Explorer queries the watcher core depends on
#[async_trait]
pub trait ExplorerApi: Send + Sync {
    /// Non-internal operations with timestamp strictly after `since`,
    /// oldest first
    async fn operations(
        &self,
        network: Network,
        address: &str,
        since: Option<i64>,
    ) -> Result<Vec<Operation>>;

    /// Owner address from the contract's persistent storage
    async fn storage_owner(&self, network: Network, address: &str) -> Result<String>;

    /// Address of the contract originated by the given operation group
    async fn origination_destination(&self, network: Network, hash: &str) -> Result<String>;
}

/// Notification channel the watcher core delivers to
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, network: Network, content: &str) -> Result<()>;
}

/// Event surfaced by a cycle for the supervisor to act on. Watchers never
/// spawn other watchers themselves; lifecycle stays with the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherEvent {
    OvenOriginated { network: Network, address: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Bootstrapping,
    Steady,
}

/// State owned exclusively by one watcher, mutated only between its own
/// poll cycles
#[derive(Debug, Clone)]
pub struct WatcherState {
    pub address: String,
    pub network: Network,
    pub kind: ContractKind,
    /// Timestamp (ms) of the most recent operation already processed
    pub watermark: Option<i64>,
    /// Resolved once on an oven's first poll, never overwritten
    pub oven_owner: Option<String>,
    phase: Phase,
}

impl WatcherState {
    pub fn new(network: Network, address: String, kind: ContractKind) -> Self {
        Self {
            address,
            network,
            kind,
            watermark: None,
            oven_owner: None,
            phase: Phase::Bootstrapping,
        }
    }

    pub fn is_steady(&self) -> bool {
        self.phase == Phase::Steady
    }
}

/// Per-contract polling state machine. One cycle fetches the operation
/// delta, applies the notification rules, and advances the watermark; the
/// registry reschedules it after the poll interval.
pub struct ContractWatcher {
    state: WatcherState,
    explorer: Arc<dyn ExplorerApi>,
    notifier: Arc<dyn NotificationSink>,
}

impl ContractWatcher {
    pub fn new(
        network: Network,
        address: String,
        kind: ContractKind,
        explorer: Arc<dyn ExplorerApi>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            state: WatcherState::new(network, address, kind),
            explorer,
            notifier,
        }
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    pub fn is_steady(&self) -> bool {
        self.state.is_steady()
    }

    /// Run one poll cycle. The first cycle only establishes the watermark
    /// (and owner, for ovens) so a fresh watcher never floods the channel
    /// with historical activity.
    pub async fn run_cycle(&mut self) -> Result<Vec<WatcherEvent>> {
        let ops = self
            .explorer
            .operations(self.state.network, &self.state.address, self.state.watermark)
            .await?;

        if !self.state.is_steady() {
            self.bootstrap(&ops).await?;
            return Ok(Vec::new());
        }

        let events = self.filter_and_notify(&ops).await;
        self.advance_watermark(&ops);
        Ok(events)
    }

    /// First cycle: resolve the oven owner if applicable, record the
    /// watermark, emit nothing.
    async fn bootstrap(&mut self, ops: &[Operation]) -> Result<()> {
        if self.state.kind == ContractKind::Oven && self.state.oven_owner.is_none() {
            let owner = match ops.iter().find(|op| op.entrypoint_is(ENTRYPOINT_MAKE_OVEN)) {
                Some(origination) => origination.source.clone(),
                None => {
                    self.explorer
                        .storage_owner(self.state.network, &self.state.address)
                        .await?
                }
            };
            debug!(address = %self.state.address, %owner, "Resolved oven owner");
            self.state.oven_owner = Some(owner);
        }

        self.advance_watermark(ops);
        self.state.phase = Phase::Steady;
        info!(
            network = %self.state.network,
            address = %self.state.address,
            watermark = ?self.state.watermark,
            "👀 Watcher bootstrapped"
        );
        Ok(())
    }

    /// Apply the notification rules to a fetched batch, oldest to newest.
    /// A failed delivery or origination lookup is logged and skipped; it
    /// never aborts the remaining operations of the cycle.
    async fn filter_and_notify(&self, ops: &[Operation]) -> Vec<WatcherEvent> {
        let mut events = Vec::new();

        for op in ops {
            if !should_notify(&self.state, op) {
                debug!(address = %self.state.address, hash = %op.hash, "Operation filtered out");
                continue;
            }

            let content = formatter::format_operation(self.state.kind, op);
            if let Err(e) = self.notifier.notify(self.state.network, &content).await {
                warn!(
                    address = %self.state.address,
                    hash = %op.hash,
                    error = %e,
                    "Failed to deliver notification, continuing with next operation"
                );
            }

            if self.state.kind == ContractKind::Factory && op.entrypoint_is(ENTRYPOINT_MAKE_OVEN) {
                match self
                    .explorer
                    .origination_destination(self.state.network, &op.hash)
                    .await
                {
                    Ok(address) => {
                        info!(network = %self.state.network, %address, "🆕 Oven originated");
                        events.push(WatcherEvent::OvenOriginated {
                            network: self.state.network,
                            address,
                        });
                    }
                    Err(e) => warn!(
                        hash = %op.hash,
                        error = %e,
                        "Failed to resolve originated oven address"
                    ),
                }
            }
        }

        events
    }

    fn advance_watermark(&mut self, ops: &[Operation]) {
        if let Some(newest) = newest_timestamp(ops) {
            let current = self.state.watermark.unwrap_or(i64::MIN);
            self.state.watermark = Some(current.max(newest));
        }
    }
}

/// Timestamp of the most recent operation in a batch, independent of
/// processing order
pub fn newest_timestamp(ops: &[Operation]) -> Option<i64> {
    ops.iter().map(|op| op.timestamp).max()
}

/// Business rules for which operations reach the notification channel
fn should_notify(state: &WatcherState, op: &Operation) -> bool {
    // makeOven on an oven is a duplicate origination signal; it only ever
    // means something on the factory
    if state.kind == ContractKind::Oven && op.entrypoint_is(ENTRYPOINT_MAKE_OVEN) {
        return false;
    }

    // default-entrypoint calls from anyone but the owner are incidental
    // value transfers (baker payouts and the like)
    if op.entrypoint_is(ENTRYPOINT_DEFAULT) && state.oven_owner.as_deref() != Some(op.source.as_str()) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn op(ts: i64, entrypoint: &str, source: &str, hash: &str) -> Operation {
        Operation {
            timestamp: ts,
            entrypoint: Some(entrypoint.to_string()),
            source: source.to_string(),
            internal: false,
            hash: hash.to_string(),
            network: None,
            amount: None,
            destination: None,
        }
    }

    #[derive(Default)]
    struct FakeExplorer {
        batches: Mutex<VecDeque<Vec<Operation>>>,
        storage_owner: Option<String>,
        originations: HashMap<String, String>,
        storage_calls: AtomicUsize,
    }

    impl FakeExplorer {
        fn with_batches(batches: Vec<Vec<Operation>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ExplorerApi for FakeExplorer {
        async fn operations(
            &self,
            _network: Network,
            _address: &str,
            _since: Option<i64>,
        ) -> Result<Vec<Operation>> {
            Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn storage_owner(&self, _network: Network, _address: &str) -> Result<String> {
            self.storage_calls.fetch_add(1, Ordering::SeqCst);
            self.storage_owner
                .clone()
                .ok_or_else(|| crate::error::WatcherError::data_shape("owner not found in storage"))
        }

        async fn origination_destination(&self, _network: Network, hash: &str) -> Result<String> {
            self.originations
                .get(hash)
                .cloned()
                .ok_or_else(|| crate::error::WatcherError::data_shape("no origination in group"))
        }
    }

    #[derive(Default)]
    struct FakeSink {
        sent: Mutex<Vec<(Network, String)>>,
        fail_next: AtomicUsize,
    }

    impl FakeSink {
        fn sent(&self) -> Vec<(Network, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for FakeSink {
        async fn notify(&self, network: Network, content: &str) -> Result<()> {
            if self.fail_next.load(Ordering::SeqCst) > 0 {
                self.fail_next.fetch_sub(1, Ordering::SeqCst);
                return Err(crate::error::WatcherError::Upstream {
                    status: 503,
                    url: "https://webhook.example/test".to_string(),
                });
            }
            self.sent.lock().unwrap().push((network, content.to_string()));
            Ok(())
        }
    }

    fn oven_watcher(
        explorer: Arc<FakeExplorer>,
        sink: Arc<FakeSink>,
    ) -> ContractWatcher {
        ContractWatcher::new(
            Network::Testnet,
            "KT1oven".to_string(),
            ContractKind::Oven,
            explorer,
            sink,
        )
    }

    fn factory_watcher(
        explorer: Arc<FakeExplorer>,
        sink: Arc<FakeSink>,
    ) -> ContractWatcher {
        ContractWatcher::new(
            Network::Testnet,
            "KT1factory".to_string(),
            ContractKind::Factory,
            explorer,
            sink,
        )
    }

    #[tokio::test]
    async fn test_first_cycle_never_notifies() {
        let explorer = Arc::new(FakeExplorer {
            batches: Mutex::new(
                vec![vec![
                    op(100, "borrow", "tz1abc", "h1"),
                    op(200, "withdraw", "tz1abc", "h2"),
                ]]
                .into(),
            ),
            storage_owner: Some("tz1abc".to_string()),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());
        let mut watcher = oven_watcher(explorer, sink.clone());

        let events = watcher.run_cycle().await.unwrap();

        assert!(events.is_empty());
        assert!(sink.sent().is_empty());
        assert_eq!(watcher.state().watermark, Some(200));
        assert!(watcher.is_steady());
    }

    #[tokio::test]
    async fn test_factory_bootstrap_records_watermark_without_notifying() {
        let explorer = Arc::new(FakeExplorer::with_batches(vec![vec![op(
            100, "makeOven", "X", "h0",
        )]]));
        let sink = Arc::new(FakeSink::default());
        let mut watcher = factory_watcher(explorer, sink.clone());

        let events = watcher.run_cycle().await.unwrap();

        assert!(events.is_empty());
        assert!(sink.sent().is_empty());
        assert_eq!(watcher.state().watermark, Some(100));
        assert!(watcher.is_steady());
    }

    #[tokio::test]
    async fn test_factory_make_oven_notifies_and_emits_spawn_event() {
        let mut explorer = FakeExplorer::with_batches(vec![
            vec![op(100, "makeOven", "X", "h0")],
            vec![op(200, "makeOven", "Y", "h1")],
        ]);
        explorer
            .originations
            .insert("h1".to_string(), "KT1newoven".to_string());
        let explorer = Arc::new(explorer);
        let sink = Arc::new(FakeSink::default());
        let mut watcher = factory_watcher(explorer, sink.clone());

        watcher.run_cycle().await.unwrap(); // bootstrap
        let events = watcher.run_cycle().await.unwrap();

        assert_eq!(sink.sent().len(), 1);
        assert_eq!(
            events,
            vec![WatcherEvent::OvenOriginated {
                network: Network::Testnet,
                address: "KT1newoven".to_string(),
            }]
        );
        assert_eq!(watcher.state().watermark, Some(200));
    }

    #[tokio::test]
    async fn test_oven_owner_from_make_oven_source_skips_storage() {
        let explorer = Arc::new(FakeExplorer::with_batches(vec![vec![op(
            100, "makeOven", "tz1creator", "h0",
        )]]));
        let sink = Arc::new(FakeSink::default());
        let mut watcher = oven_watcher(explorer.clone(), sink);

        watcher.run_cycle().await.unwrap();

        assert_eq!(watcher.state().oven_owner.as_deref(), Some("tz1creator"));
        assert_eq!(explorer.storage_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oven_owner_falls_back_to_storage_query() {
        let explorer = Arc::new(FakeExplorer {
            batches: Mutex::new(vec![vec![op(100, "borrow", "tz1other", "h0")]].into()),
            storage_owner: Some("tz1abc".to_string()),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());
        let mut watcher = oven_watcher(explorer.clone(), sink);

        watcher.run_cycle().await.unwrap();

        assert_eq!(watcher.state().oven_owner.as_deref(), Some("tz1abc"));
        assert_eq!(explorer.storage_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oven_owner_resolution_failure_is_fatal_for_bootstrap() {
        // No makeOven in the first batch and no owner in storage
        let explorer = Arc::new(FakeExplorer::with_batches(vec![vec![op(
            100, "borrow", "tz1other", "h0",
        )]]));
        let sink = Arc::new(FakeSink::default());
        let mut watcher = oven_watcher(explorer, sink);

        assert!(watcher.run_cycle().await.is_err());
        assert!(!watcher.is_steady());
    }

    #[tokio::test]
    async fn test_oven_owner_never_re_resolved() {
        let explorer = Arc::new(FakeExplorer {
            batches: Mutex::new(
                vec![
                    vec![op(100, "makeOven", "tz1creator", "h0")],
                    vec![op(200, "makeOven", "tz1usurper", "h1")],
                ]
                .into(),
            ),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());
        let mut watcher = oven_watcher(explorer, sink);

        watcher.run_cycle().await.unwrap();
        watcher.run_cycle().await.unwrap();

        assert_eq!(watcher.state().oven_owner.as_deref(), Some("tz1creator"));
    }

    #[tokio::test]
    async fn test_make_oven_on_oven_never_notifies() {
        let explorer = Arc::new(FakeExplorer {
            batches: Mutex::new(
                vec![
                    vec![op(100, "makeOven", "tz1creator", "h0")],
                    vec![op(200, "makeOven", "tz1creator", "h1")],
                ]
                .into(),
            ),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());
        let mut watcher = oven_watcher(explorer, sink.clone());

        watcher.run_cycle().await.unwrap();
        let events = watcher.run_cycle().await.unwrap();

        assert!(events.is_empty());
        assert!(sink.sent().is_empty());
        assert_eq!(watcher.state().watermark, Some(200));
    }

    #[tokio::test]
    async fn test_default_from_non_owner_suppressed_but_watermark_advances() {
        let explorer = Arc::new(FakeExplorer {
            batches: Mutex::new(
                vec![
                    vec![op(100, "makeOven", "tz1abc", "h0")],
                    vec![op(200, "default", "tz1baker", "h1")],
                ]
                .into(),
            ),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());
        let mut watcher = oven_watcher(explorer, sink.clone());

        watcher.run_cycle().await.unwrap();
        watcher.run_cycle().await.unwrap();

        assert!(sink.sent().is_empty());
        assert_eq!(watcher.state().watermark, Some(200));
    }

    #[tokio::test]
    async fn test_default_from_owner_notifies_exactly_once() {
        let explorer = Arc::new(FakeExplorer {
            batches: Mutex::new(
                vec![
                    vec![op(100, "makeOven", "tz1abc", "h0")],
                    vec![op(200, "default", "tz1abc", "h1")],
                ]
                .into(),
            ),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());
        let mut watcher = oven_watcher(explorer, sink.clone());

        watcher.run_cycle().await.unwrap();
        watcher.run_cycle().await.unwrap();

        assert_eq!(sink.sent().len(), 1);
        assert_eq!(sink.sent()[0].0, Network::Testnet);
    }

    #[tokio::test]
    async fn test_empty_cycle_is_idempotent() {
        let explorer = Arc::new(FakeExplorer {
            batches: Mutex::new(
                vec![vec![op(100, "makeOven", "tz1abc", "h0")], vec![], vec![]].into(),
            ),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());
        let mut watcher = oven_watcher(explorer, sink.clone());

        watcher.run_cycle().await.unwrap();
        watcher.run_cycle().await.unwrap();
        let before = watcher.state().watermark;
        watcher.run_cycle().await.unwrap();

        assert_eq!(watcher.state().watermark, before);
        assert_eq!(watcher.state().watermark, Some(100));
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_abort_remaining_operations() {
        let explorer = Arc::new(FakeExplorer {
            batches: Mutex::new(
                vec![
                    vec![op(100, "makeOven", "tz1abc", "h0")],
                    vec![
                        op(200, "borrow", "tz1abc", "h1"),
                        op(300, "withdraw", "tz1abc", "h2"),
                    ],
                ]
                .into(),
            ),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());
        sink.fail_next.store(1, Ordering::SeqCst);
        let mut watcher = oven_watcher(explorer, sink.clone());

        watcher.run_cycle().await.unwrap();
        let events = watcher.run_cycle().await.unwrap();

        // First delivery failed, second still went out, watermark advanced
        assert!(events.is_empty());
        assert_eq!(sink.sent().len(), 1);
        assert!(sink.sent()[0].1.contains("withdraw"));
        assert_eq!(watcher.state().watermark, Some(300));
    }

    #[tokio::test]
    async fn test_origination_lookup_failure_does_not_abort_cycle() {
        // Origination map empty so the opg lookup fails mid-cycle; the
        // notification still goes out and the watermark still advances
        let explorer = Arc::new(FakeExplorer {
            batches: Mutex::new(
                vec![
                    vec![op(100, "makeOven", "X", "h0")],
                    vec![op(200, "makeOven", "Y", "h1")],
                ]
                .into(),
            ),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());
        let mut watcher = factory_watcher(explorer, sink.clone());

        watcher.run_cycle().await.unwrap();
        let events = watcher.run_cycle().await.unwrap();

        assert!(events.is_empty());
        assert_eq!(sink.sent().len(), 1);
        assert_eq!(watcher.state().watermark, Some(200));
    }

    #[test]
    fn test_newest_timestamp_ignores_order() {
        let ops = vec![
            op(300, "borrow", "a", "h1"),
            op(100, "borrow", "a", "h2"),
            op(200, "borrow", "a", "h3"),
        ];
        assert_eq!(newest_timestamp(&ops), Some(300));
        assert_eq!(newest_timestamp(&[]), None);
    }
}
