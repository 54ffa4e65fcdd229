use async_trait::async_trait;
use mtrefresh_client::RouterClientCache;
use mtrefresh_common::protocol::error::Result;
use mtrefresh_common::MountTable;
use std::sync::Arc;

use crate::node::NodeAddress;

/// Performs the mount table refresh for one router.
///
/// `Ok(true)` means the router reloaded its cache. `Ok(false)` and `Err`
/// both count as a failed refresh.
///
/// Each refresh runs on a worker thread of its own, so an implementation
/// may block that thread. The cycle deadline still holds; a blocked refresh
/// keeps its thread until the blocking call returns.
#[async_trait]
pub trait NodeManager: Send + Sync {
    async fn refresh(&self) -> Result<bool>;
}

/// Refreshes the mount table of the router this process runs in.
///
/// No RPC is involved, so no admin client is needed.
pub struct LocalManager {
    mount_table: Arc<MountTable>,
}

impl LocalManager {
    pub fn new(mount_table: Arc<MountTable>) -> Self {
        Self { mount_table }
    }
}

#[async_trait]
impl NodeManager for LocalManager {
    async fn refresh(&self) -> Result<bool> {
        self.mount_table.reload().await?;
        Ok(true)
    }
}

/// Refreshes a remote router through its admin endpoint.
///
/// The admin client is looked up in the cache when `refresh` runs, not when
/// the manager is built, so building a manager never touches the network.
pub struct RemoteManager {
    address: NodeAddress,
    clients: Arc<RouterClientCache>,
}

impl RemoteManager {
    pub fn new(address: NodeAddress, clients: Arc<RouterClientCache>) -> Self {
        Self { address, clients }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }
}

#[async_trait]
impl NodeManager for RemoteManager {
    async fn refresh(&self) -> Result<bool> {
        let client = self.clients.get(self.address.as_str());
        client.refresh_mount_table_entries().await
    }
}
