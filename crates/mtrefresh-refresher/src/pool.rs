use mtrefresh_common::protocol::error::{RefreshError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Bounded pool that refresh tasks run on.
///
/// At most `size` units execute at once; the rest wait for a permit. The
/// pool is created by the caller and shared across cycles, so its size is
/// the only backpressure.
///
/// Each unit runs on its own blocking thread, driven by the pool's runtime
/// handle. A unit may therefore block its thread (synchronous I/O,
/// `std::thread::sleep`) without stalling the tasks that wait on it.
///
/// # Example
///
/// ```rust
/// use mtrefresh_refresher::WorkerPool;
///
/// # #[tokio::main]
/// # async fn main() {
/// let pool = WorkerPool::new(4).unwrap();
/// let answer = pool.spawn(async { 40 + 2 }).await.unwrap();
/// assert_eq!(answer, 42);
/// # }
/// ```
#[derive(Debug)]
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool on the current tokio runtime.
    pub fn new(size: usize) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| {
            RefreshError::InvalidConfig(format!("worker pool requires a tokio runtime: {}", e))
        })?;
        Self::with_handle(handle, size)
    }

    /// Creates a pool spawning onto `handle`.
    pub fn with_handle(handle: Handle, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(RefreshError::InvalidConfig(
                "worker pool size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            handle,
            permits: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of idle workers.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Submits `work`. It starts once a worker is free.
    ///
    /// Aborting the returned handle releases the worker and cancels `work` at
    /// its next `.await`. Work stuck in a blocking call keeps its thread until
    /// the call returns.
    pub fn spawn<F>(&self, work: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permits = self.permits.clone();
        let runtime = self.handle.clone();
        self.handle.spawn(async move {
            // The semaphore is never closed, so acquisition only waits
            let _permit = permits.acquire_owned().await.ok();

            let cancel = CancellationToken::new();
            let _cancel_on_abort = cancel.clone().drop_guard();
            let unit = tokio::task::spawn_blocking(move || {
                runtime.block_on(async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        output = work => Some(output),
                    }
                })
            });

            match unit.await {
                Ok(Some(output)) => output,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                // Cancelled only once this task is gone or the runtime shuts down
                Ok(None) | Err(_) => std::future::pending().await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_new_outside_runtime_fails() {
        assert!(matches!(
            WorkerPool::new(2),
            Err(RefreshError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_size_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(RefreshError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_spawn_returns_output() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.spawn(async { "done" }).await.unwrap(), "done");
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_work_does_not_stall_runtime() {
        let pool = WorkerPool::new(4).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                pool.spawn(async {
                    std::thread::sleep(Duration::from_millis(500));
                })
            })
            .collect();

        let started = std::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(pool.available(), 0);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(pool.available(), 4);
    }

    #[tokio::test]
    async fn test_panic_reaches_join_handle() {
        let pool = WorkerPool::new(1).unwrap();
        let err = pool
            .spawn(async { panic!("unit failed") })
            .await
            .unwrap_err();
        assert!(err.is_panic());
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_abort_releases_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let stuck = pool.spawn(std::future::pending::<()>());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(pool.available(), 0);

        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());
        assert_eq!(pool.available(), 1);
    }
}
