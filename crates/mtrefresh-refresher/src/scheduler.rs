use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::refresher::MountTableRefresher;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between the start of two cycles
    ///
    /// Default: 60 seconds
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Runs refresh cycles on a fixed interval until shut down.
///
/// Cycles never overlap; a cycle that outlasts the interval delays the next tick.
pub struct RefreshScheduler {
    refresher: Arc<MountTableRefresher>,
    config: SchedulerConfig,
}

impl RefreshScheduler {
    pub fn new(refresher: Arc<MountTableRefresher>, config: SchedulerConfig) -> Self {
        Self { refresher, config }
    }

    /// Starts the loop. The first cycle runs immediately.
    ///
    /// Cancelling `shutdown` stops the loop and interrupts the wait of the
    /// cycle in progress.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Mount table refresher started, interval {:?}",
                self.config.interval
            );
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let status = self.refresher.refresh_cycle_until(&shutdown).await;
                        debug!("Scheduled cycle finished: {:?}", status);
                    }
                }
            }

            info!("Mount table refresher stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CycleEvent, RecordingSink};
    use crate::manager::NodeManager;
    use crate::node::NodeAddress;
    use crate::pool::WorkerPool;
    use crate::reporter::ClientCache;
    use crate::resolver::ManagerResolver;
    use crate::store::StaticNodeStore;
    use async_trait::async_trait;
    use mtrefresh_common::protocol::error::Result;

    struct Healthy;

    #[async_trait]
    impl NodeManager for Healthy {
        async fn refresh(&self) -> Result<bool> {
            Ok(true)
        }
    }

    struct OkResolver;

    impl ManagerResolver for OkResolver {
        fn resolve(&self, _address: &NodeAddress) -> Box<dyn NodeManager> {
            Box::new(Healthy)
        }
    }

    struct NoCache;

    impl ClientCache for NoCache {
        fn invalidate(&self, _address: &NodeAddress) {}
    }

    fn refresher(sink: Arc<RecordingSink>) -> Arc<MountTableRefresher> {
        Arc::new(
            MountTableRefresher::new(
                Arc::new(StaticNodeStore::from_addresses(["r1:8111"])),
                Arc::new(OkResolver),
                Arc::new(NoCache),
                Arc::new(WorkerPool::new(1).unwrap()),
            )
            .with_sink(sink),
        )
    }

    #[test]
    fn test_default_interval() {
        assert_eq!(SchedulerConfig::default().interval, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_runs_repeatedly_until_shutdown() {
        let sink = Arc::new(RecordingSink::new());
        let shutdown = CancellationToken::new();
        let handle = RefreshScheduler::new(
            refresher(sink.clone()),
            SchedulerConfig {
                interval: Duration::from_millis(20),
            },
        )
        .spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let summaries = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, CycleEvent::Summary { .. }))
            .count();
        assert!(summaries >= 2, "only {} cycles ran", summaries);

        let after = sink.events().len();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(sink.events().len(), after);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let sink = Arc::new(RecordingSink::new());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        RefreshScheduler::new(refresher(sink.clone()), SchedulerConfig::default())
            .spawn(shutdown)
            .await
            .unwrap();

        assert!(sink.events().is_empty());
    }
}
