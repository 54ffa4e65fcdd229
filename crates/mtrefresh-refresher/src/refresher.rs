use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::coordinator::{FanOut, FanOutCoordinator};
use crate::events::{EventSink, TracingSink};
use crate::node::{NodeAddress, RouterState};
use crate::pool::WorkerPool;
use crate::reporter::{ClientCache, CycleReport, CycleReporter};
use crate::resolver::ManagerResolver;
use crate::store::NodeStore;
use crate::task::RefreshTask;

/// Refresher configuration.
#[derive(Debug, Clone)]
pub struct RefresherConfig {
    /// How long a cycle waits for all routers to answer
    ///
    /// Default: 60 seconds
    pub cache_update_timeout: Duration,
    /// Abort refreshes still running when the wait ends
    ///
    /// When false they keep their worker until they finish on their own and
    /// their result is ignored.
    /// Default: true
    pub cancel_stragglers: bool,
    /// Report the outcomes collected so far when a cycle is interrupted
    ///
    /// Default: false (an interrupted cycle emits no summary)
    pub report_on_interrupt: bool,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            cache_update_timeout: Duration::from_secs(60),
            cancel_stragglers: true,
            report_on_interrupt: false,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleStatus {
    /// No router had a usable admin address; nothing was submitted
    NoEligibleNodes,
    /// The node store could not be read; nothing was submitted
    StoreUnavailable,
    /// The wait ended normally or at the deadline and a summary was emitted
    Reported(CycleReport),
    /// The wait was interrupted; carries a report only with `report_on_interrupt`
    Interrupted(Option<CycleReport>),
}

/// Refreshes the mount table cache of every known router.
///
/// Each call to [`refresh`](Self::refresh) is one cycle:
///
/// 1. Read the router records from the [`NodeStore`]
/// 2. Skip records without a usable admin address
/// 3. Resolve a manager per address and build one [`RefreshTask`] each
/// 4. Run them through the [`FanOutCoordinator`] under `cache_update_timeout`
/// 5. Hand the slots to the [`CycleReporter`]
///
/// Nothing is retained between cycles apart from the client cache.
///
/// # Example
///
/// ```no_run
/// use mtrefresh_client::{ClientConfig, RouterClientCache};
/// use mtrefresh_common::MountTable;
/// use mtrefresh_refresher::{DefaultResolver, MountTableRefresher, StaticNodeStore, WorkerPool};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let clients = Arc::new(RouterClientCache::new(ClientConfig::default()));
/// let resolver = DefaultResolver::new(Arc::new(MountTable::new(vec![])), clients.clone());
/// let store = StaticNodeStore::from_addresses(["router1:8111", "router2:8111"]);
///
/// let refresher = MountTableRefresher::new(
///     Arc::new(store),
///     Arc::new(resolver),
///     clients,
///     Arc::new(WorkerPool::new(4)?),
/// );
/// refresher.refresh().await;
/// # Ok(())
/// # }
/// ```
pub struct MountTableRefresher {
    store: Arc<dyn NodeStore>,
    resolver: Arc<dyn ManagerResolver>,
    cache: Arc<dyn ClientCache>,
    pool: Arc<WorkerPool>,
    sink: Arc<dyn EventSink>,
    config: RefresherConfig,
    interrupt: CancellationToken,
}

impl MountTableRefresher {
    /// Creates a refresher with the default configuration.
    pub fn new(
        store: Arc<dyn NodeStore>,
        resolver: Arc<dyn ManagerResolver>,
        cache: Arc<dyn ClientCache>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self::with_config(store, resolver, cache, pool, RefresherConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn NodeStore>,
        resolver: Arc<dyn ManagerResolver>,
        cache: Arc<dyn ClientCache>,
        pool: Arc<WorkerPool>,
        config: RefresherConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            cache,
            pool,
            sink: Arc::new(TracingSink),
            config,
            interrupt: CancellationToken::new(),
        }
    }

    /// Routes cycle events to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Uses `token` to interrupt waits. Once cancelled, every later cycle
    /// is interrupted as well.
    pub fn with_interrupt_token(mut self, token: CancellationToken) -> Self {
        self.interrupt = token;
        self
    }

    /// Token that interrupts the wait of the running cycle.
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    pub fn config(&self) -> &RefresherConfig {
        &self.config
    }

    /// Runs one cycle. Never fails and never panics on node failures.
    pub async fn refresh(&self) {
        let status = self.refresh_cycle().await;
        debug!("Refresh cycle finished: {:?}", status);
    }

    /// Runs one cycle and tells how it ended.
    pub async fn refresh_cycle(&self) -> CycleStatus {
        self.refresh_cycle_until(&self.interrupt).await
    }

    /// Runs one cycle whose wait is interrupted by `interrupt`.
    pub async fn refresh_cycle_until(&self, interrupt: &CancellationToken) -> CycleStatus {
        let records = match self.store.cached_records().await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to read router records: {}", e);
                return CycleStatus::StoreUnavailable;
            }
        };

        let tasks: Vec<RefreshTask> = records
            .iter()
            .filter_map(|record| self.create_task(record))
            .collect();
        if tasks.is_empty() {
            return CycleStatus::NoEligibleNodes;
        }

        let coordinator = FanOutCoordinator::new(
            self.pool.clone(),
            self.sink.clone(),
            self.config.cancel_stragglers,
        );
        let reporter = CycleReporter::new(self.cache.clone(), self.sink.clone());

        match coordinator
            .run_all(tasks, self.config.cache_update_timeout, interrupt)
            .await
        {
            FanOut::Interrupted(slots) => {
                let report = self
                    .config
                    .report_on_interrupt
                    .then(|| reporter.report(&slots));
                CycleStatus::Interrupted(report)
            }
            fan_out => CycleStatus::Reported(reporter.report(fan_out.slots())),
        }
    }

    /// Builds the task for one record, or `None` if it has no usable admin address.
    fn create_task(&self, record: &RouterState) -> Option<RefreshTask> {
        let address = NodeAddress::parse(record.admin_address())?;
        let manager = self.resolver.resolve(&address);
        Some(RefreshTask::new(address, manager))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CycleEvent, RecordingSink};
    use crate::manager::NodeManager;
    use crate::store::StaticNodeStore;
    use async_trait::async_trait;
    use mtrefresh_common::protocol::error::{RefreshError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingResolver {
        resolved: Mutex<Vec<String>>,
    }

    struct Always;

    #[async_trait]
    impl NodeManager for Always {
        async fn refresh(&self) -> Result<bool> {
            Ok(true)
        }
    }

    impl ManagerResolver for CountingResolver {
        fn resolve(&self, address: &NodeAddress) -> Box<dyn NodeManager> {
            self.resolved.lock().unwrap().push(address.to_string());
            Box::new(Always)
        }
    }

    struct NoCache;

    impl ClientCache for NoCache {
        fn invalidate(&self, _address: &NodeAddress) {}
    }

    struct BrokenStore(AtomicUsize);

    #[async_trait]
    impl NodeStore for BrokenStore {
        async fn cached_records(&self) -> Result<Vec<RouterState>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(RefreshError::NodeStore("store offline".into()))
        }
    }

    fn refresher(
        store: Arc<dyn NodeStore>,
    ) -> (MountTableRefresher, Arc<CountingResolver>, Arc<RecordingSink>) {
        let resolver = Arc::new(CountingResolver {
            resolved: Mutex::new(Vec::new()),
        });
        let sink = Arc::new(RecordingSink::new());
        let refresher = MountTableRefresher::new(
            store,
            resolver.clone(),
            Arc::new(NoCache),
            Arc::new(WorkerPool::new(2).unwrap()),
        )
        .with_sink(sink.clone());
        (refresher, resolver, sink)
    }

    #[test]
    fn test_config_default() {
        let config = RefresherConfig::default();
        assert_eq!(config.cache_update_timeout, Duration::from_secs(60));
        assert!(config.cancel_stragglers);
        assert!(!config.report_on_interrupt);
    }

    #[tokio::test]
    async fn test_blank_addresses_are_never_resolved() {
        let store = StaticNodeStore::new(vec![
            RouterState::new("r1:8111"),
            RouterState::new(""),
            RouterState::without_admin(),
            RouterState::new("  "),
            RouterState::new("r2:8111"),
        ]);
        let (refresher, resolver, sink) = refresher(Arc::new(store));

        let status = refresher.refresh_cycle().await;

        assert_eq!(*resolver.resolved.lock().unwrap(), vec!["r1:8111", "r2:8111"]);
        let CycleStatus::Reported(report) = status else {
            panic!("Expected a reported cycle");
        };
        assert_eq!(report.total(), 2);
        assert_eq!(
            sink.events(),
            vec![CycleEvent::Summary {
                success_count: 2,
                failure_count: 0
            }]
        );
    }

    #[tokio::test]
    async fn test_store_failure_aborts_cycle() {
        let store = Arc::new(BrokenStore(AtomicUsize::new(0)));
        let (refresher, resolver, sink) = refresher(store.clone());

        assert_eq!(refresher.refresh_cycle().await, CycleStatus::StoreUnavailable);
        refresher.refresh().await;

        assert_eq!(store.0.load(Ordering::SeqCst), 2);
        assert!(resolver.resolved.lock().unwrap().is_empty());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_token_is_shared() {
        let store = StaticNodeStore::from_addresses(["r1:8111"]);
        let (refresher, _resolver, sink) = refresher(Arc::new(store));

        refresher.interrupt_token().cancel();

        assert_eq!(refresher.refresh_cycle().await, CycleStatus::Interrupted(None));
        assert_eq!(sink.events(), vec![CycleEvent::Interrupted]);
    }
}
