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

use mtrefresh_client::RouterClientCache;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::coordinator::TaskSlot;
use crate::events::{CycleEvent, EventSink};
use crate::node::NodeAddress;
use crate::task::{FailureReason, Outcome};

/// Cache of admin clients, keyed by address.
///
/// Invalidation is fire-and-forget: it cannot fail, and discarding a client
/// that is not cached is a no-op.
pub trait ClientCache: Send + Sync {
    fn invalidate(&self, address: &NodeAddress);
}

impl ClientCache for RouterClientCache {
    fn invalidate(&self, address: &NodeAddress) {
        RouterClientCache::invalidate(self, address.as_str());
    }
}

/// Tally of one reported cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub failed_addresses: BTreeSet<NodeAddress>,
}

impl CycleReport {
    /// Number of tasks the report covers
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// Turns the slots of a cycle into a [`CycleReport`].
///
/// A slot without an outcome counts as failed. Every failed slot has its
/// cached client invalidated, and exactly one summary event is emitted once
/// tallying is done.
pub struct CycleReporter {
    cache: Arc<dyn ClientCache>,
    sink: Arc<dyn EventSink>,
}

impl CycleReporter {
    pub fn new(cache: Arc<dyn ClientCache>, sink: Arc<dyn EventSink>) -> Self {
        Self { cache, sink }
    }

    pub fn report(&self, slots: &[TaskSlot]) -> CycleReport {
        let mut report = CycleReport::default();

        for slot in slots {
            match &slot.outcome {
                Some(Outcome::Succeeded) => report.success_count += 1,
                failed => {
                    let reason = match failed {
                        Some(Outcome::Failed(reason)) => reason.to_string(),
                        _ => FailureReason::TimedOut.to_string(),
                    };
                    debug!("Invalidating admin client of {} ({})", slot.address, reason);

                    report.failure_count += 1;
                    self.cache.invalidate(&slot.address);
                    report.failed_addresses.insert(slot.address.clone());
                }
            }
        }

        self.sink.emit(&CycleEvent::Summary {
            success_count: report.success_count,
            failure_count: report.failure_count,
        });
        report
    }
}
