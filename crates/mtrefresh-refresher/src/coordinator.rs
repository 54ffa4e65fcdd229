//! Fan-out / fan-in of refresh tasks under one deadline.
//!
//! Every task is submitted to the [`WorkerPool`] as its own unit. The
//! caller then waits for all of them, bounded by the deadline and by the
//! interrupt token, whichever fires first. Outcomes come back in input
//! order; a slot whose task had not finished holds no outcome.
//!
//! The deadline only bounds the wait. What happens to tasks still running
//! afterwards depends on `cancel_stragglers`:
//!
//! - `true`: they are aborted and their workers freed
//! - `false`: they run to completion in the background and their outcome
//!   is dropped

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::events::{CycleEvent, EventSink};
use crate::node::NodeAddress;
use crate::pool::WorkerPool;
use crate::task::{FailureReason, Outcome, RefreshTask};

/// Outcome slot of one submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSlot {
    pub address: NodeAddress,
    /// `None` when the task had not finished when the wait ended
    pub outcome: Option<Outcome>,
}

/// How the wait ended, with the slots of every submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOut {
    /// Every task finished before the deadline
    Completed(Vec<TaskSlot>),
    /// The deadline elapsed first
    DeadlineExceeded(Vec<TaskSlot>),
    /// The interrupt token fired first
    Interrupted(Vec<TaskSlot>),
}

impl FanOut {
    pub fn slots(&self) -> &[TaskSlot] {
        match self {
            FanOut::Completed(slots)
            | FanOut::DeadlineExceeded(slots)
            | FanOut::Interrupted(slots) => slots,
        }
    }

    pub fn into_slots(self) -> Vec<TaskSlot> {
        match self {
            FanOut::Completed(slots)
            | FanOut::DeadlineExceeded(slots)
            | FanOut::Interrupted(slots) => slots,
        }
    }
}

enum WaitEnd {
    AllFinished,
    Deadline,
    Interrupted,
}

pub struct FanOutCoordinator {
    pool: Arc<WorkerPool>,
    sink: Arc<dyn EventSink>,
    cancel_stragglers: bool,
}

impl FanOutCoordinator {
    pub fn new(pool: Arc<WorkerPool>, sink: Arc<dyn EventSink>, cancel_stragglers: bool) -> Self {
        Self {
            pool,
            sink,
            cancel_stragglers,
        }
    }

    /// Runs every task and waits at most `deadline` for all of them.
    ///
    /// Emits [`CycleEvent::DeadlineExceeded`] or [`CycleEvent::Interrupted`]
    /// when the wait ends early. Never fails.
    pub async fn run_all(
        &self,
        tasks: Vec<RefreshTask>,
        deadline: Duration,
        interrupt: &CancellationToken,
    ) -> FanOut {
        let mut slots = Vec::with_capacity(tasks.len());
        let mut aborts = Vec::with_capacity(tasks.len());
        let mut pending = FuturesUnordered::new();

        for (index, task) in tasks.into_iter().enumerate() {
            slots.push(TaskSlot {
                address: task.address().clone(),
                outcome: None,
            });
            let handle = self.pool.spawn(task.run());
            aborts.push(handle.abort_handle());
            pending.push(async move { (index, handle.await) });
        }

        let end = {
            let collect = async {
                while let Some((index, joined)) = pending.next().await {
                    let outcome = joined.unwrap_or_else(|e| {
                        Outcome::Failed(FailureReason::Error(format!("worker task failed: {}", e)))
                    });
                    slots[index].outcome = Some(outcome);
                }
            };

            tokio::select! {
                biased;
                _ = interrupt.cancelled() => WaitEnd::Interrupted,
                finished = tokio::time::timeout(deadline, collect) => match finished {
                    Ok(()) => WaitEnd::AllFinished,
                    Err(_) => WaitEnd::Deadline,
                },
            }
        };
        // Dropping the remaining join handles detaches their tasks
        drop(pending);

        if !matches!(end, WaitEnd::AllFinished) {
            self.release_stragglers(&slots, &aborts);
        }

        match end {
            WaitEnd::AllFinished => FanOut::Completed(slots),
            WaitEnd::Deadline => {
                self.sink.emit(&CycleEvent::DeadlineExceeded);
                FanOut::DeadlineExceeded(slots)
            }
            WaitEnd::Interrupted => {
                self.sink.emit(&CycleEvent::Interrupted);
                FanOut::Interrupted(slots)
            }
        }
    }

    fn release_stragglers(&self, slots: &[TaskSlot], aborts: &[tokio::task::AbortHandle]) {
        for (slot, abort) in slots.iter().zip(aborts) {
            if slot.outcome.is_some() {
                continue;
            }
            if self.cancel_stragglers {
                abort.abort();
                debug!("Cancelled unfinished refresh of {}", slot.address);
            } else {
                debug!("Leaving unfinished refresh of {} running", slot.address);
            }
        }
    }
}
