//! mtrefresh Refresher
//!
//! Triggers a mount table cache refresh on every known router at once,
//! waits for them under a single deadline, and discards the cached admin
//! client of every router that failed.
//!
//! # Flow of one cycle
//!
//! ```text
//! NodeStore ─► MountTableRefresher ─► RefreshTask × N ─► FanOutCoordinator
//!                                                              │
//!                                  EventSink ◄── CycleReporter ◄┘
//!                                  ClientCache::invalidate (failed nodes)
//! ```
//!
//! # Components
//!
//! - [`NodeManager`]: performs the refresh call for one router
//!   ([`LocalManager`] in-process, [`RemoteManager`] over HTTP)
//! - [`ManagerResolver`]: picks the manager variant for an address
//! - [`RefreshTask`]: runs one manager and yields exactly one [`Outcome`]
//! - [`FanOutCoordinator`]: runs all tasks on the [`WorkerPool`] under a deadline
//! - [`CycleReporter`]: tallies outcomes, emits the summary, invalidates clients
//! - [`MountTableRefresher`]: the entry point, `refresh()`
//! - [`RefreshScheduler`]: runs `refresh()` periodically
//! - [`EventSink`]: receives cycle events; [`TracingSink`] logs them and
//!   [`RecordingSink`] also keeps them for the embedding program

pub mod coordinator;
pub mod events;
pub mod manager;
pub mod node;
pub mod pool;
pub mod refresher;
pub mod reporter;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod task;

pub use coordinator::{FanOut, FanOutCoordinator, TaskSlot};
pub use events::{CycleEvent, EventSink, RecordingSink, TracingSink};
pub use manager::{LocalManager, NodeManager, RemoteManager};
pub use node::{NodeAddress, RouterState};
pub use pool::WorkerPool;
pub use refresher::{CycleStatus, MountTableRefresher, RefresherConfig};
pub use reporter::{ClientCache, CycleReport, CycleReporter};
pub use resolver::{DefaultResolver, ManagerResolver};
pub use scheduler::{RefreshScheduler, SchedulerConfig};
pub use store::{FileNodeStore, NodeStore, StaticNodeStore};
pub use task::{FailureReason, Outcome, RefreshTask};
