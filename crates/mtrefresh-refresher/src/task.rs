use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::debug;

use crate::manager::NodeManager;
use crate::node::NodeAddress;

/// Why a node counts as failed for a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The manager answered `false`
    Rejected,
    /// The manager returned an error
    Error(String),
    /// The manager panicked
    Panicked(String),
    /// No outcome arrived before the cycle stopped waiting
    TimedOut,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Rejected => write!(f, "refresh rejected"),
            FailureReason::Error(msg) => write!(f, "error: {}", msg),
            FailureReason::Panicked(msg) => write!(f, "panicked: {}", msg),
            FailureReason::TimedOut => write!(f, "no result within the time budget"),
        }
    }
}

/// Result of refreshing one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(FailureReason),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// One node's refresh, run once.
///
/// `run` consumes the task, so each task yields exactly one [`Outcome`].
pub struct RefreshTask {
    address: NodeAddress,
    manager: Box<dyn NodeManager>,
}

impl RefreshTask {
    pub fn new(address: NodeAddress, manager: Box<dyn NodeManager>) -> Self {
        Self { address, manager }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// Calls the manager and converts whatever happens into an outcome.
    ///
    /// Errors and panics raised by the manager never leave this method.
    pub async fn run(self) -> Outcome {
        let result = AssertUnwindSafe(self.manager.refresh()).catch_unwind().await;

        let outcome = match result {
            Ok(Ok(true)) => Outcome::Succeeded,
            Ok(Ok(false)) => Outcome::Failed(FailureReason::Rejected),
            Ok(Err(e)) => Outcome::Failed(FailureReason::Error(e.to_string())),
            Err(payload) => Outcome::Failed(FailureReason::Panicked(panic_message(payload))),
        };

        if let Outcome::Failed(reason) = &outcome {
            debug!("Refresh of {} failed: {}", self.address, reason);
        }
        outcome
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
