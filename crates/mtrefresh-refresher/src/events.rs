// Copyright 2025 mtrefresh Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cycle events and where they go.
//!
//! A cycle emits at most one line of each kind. The rendered text of each
//! event is stable; operators grep for it.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    /// Final tally of a reported cycle
    Summary {
        success_count: usize,
        failure_count: usize,
    },
    /// The deadline elapsed before every node finished
    DeadlineExceeded,
    /// The wait was interrupted
    Interrupted,
}

impl fmt::Display for CycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleEvent::Summary {
                success_count,
                failure_count,
            } => write!(
                f,
                "Mount table entries cache refresh successCount={},failureCount={}",
                success_count, failure_count
            ),
            CycleEvent::DeadlineExceeded => {
                write!(f, "Not all router admins updated their cache")
            }
            CycleEvent::Interrupted => write!(f, "Mount table cache refresher was interrupted."),
        }
    }
}

/// Receives cycle events, one line each.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CycleEvent);
}

/// Forwards events to `tracing`: summaries at INFO, notices at WARN.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &CycleEvent) {
        match event {
            CycleEvent::Summary { .. } => info!("{}", event),
            CycleEvent::DeadlineExceeded | CycleEvent::Interrupted => warn!("{}", event),
        }
    }
}

/// Keeps every event it receives, also forwarding to `tracing`.
///
/// Hand one to a refresher when the embedding program wants the cycle
/// outcomes as values rather than log lines, for health reporting or for
/// assertions against a running cluster.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CycleEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rendered lines, in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }

    pub fn contains(&self, event: &CycleEvent) -> bool {
        self.events().contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &CycleEvent) {
        TracingSink.emit(event);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
