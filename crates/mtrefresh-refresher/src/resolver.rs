use mtrefresh_client::RouterClientCache;
use mtrefresh_common::MountTable;
use std::sync::Arc;

use crate::manager::{LocalManager, NodeManager, RemoteManager};
use crate::node::NodeAddress;

/// Marker substring identifying the local router's admin address
pub const DEFAULT_LOCAL_MARKER: &str = "local";

/// Maps an admin address onto the manager that refreshes it.
///
/// Resolution must not perform I/O or fail.
pub trait ManagerResolver: Send + Sync {
    fn resolve(&self, address: &NodeAddress) -> Box<dyn NodeManager>;
}

/// Resolves addresses containing the local marker to a [`LocalManager`] and
/// everything else to a [`RemoteManager`].
pub struct DefaultResolver {
    local_table: Arc<MountTable>,
    clients: Arc<RouterClientCache>,
    local_marker: String,
}

impl DefaultResolver {
    pub fn new(local_table: Arc<MountTable>, clients: Arc<RouterClientCache>) -> Self {
        Self {
            local_table,
            clients,
            local_marker: DEFAULT_LOCAL_MARKER.to_string(),
        }
    }

    pub fn with_local_marker(mut self, marker: impl Into<String>) -> Self {
        self.local_marker = marker.into();
        self
    }

    pub fn local_marker(&self) -> &str {
        &self.local_marker
    }
}

impl ManagerResolver for DefaultResolver {
    fn resolve(&self, address: &NodeAddress) -> Box<dyn NodeManager> {
        if address.is_local(&self.local_marker) {
            Box::new(LocalManager::new(self.local_table.clone()))
        } else {
            Box::new(RemoteManager::new(address.clone(), self.clients.clone()))
        }
    }
}
