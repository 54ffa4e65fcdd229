//! JSON-RPC dispatch for the router admin endpoint.
//!
//! - `refreshMountTableEntries`: reload the mount table; answers `true` on
//!   success and `false` when the reload failed
//! - `_info`: mount table summary
//! - anything else: method not found

use mtrefresh_common::protocol::{methods, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use mtrefresh_common::MountTable;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AdminRouter {
    mount_table: Arc<MountTable>,
}

impl AdminRouter {
    pub fn new(mount_table: Arc<MountTable>) -> Self {
        Self { mount_table }
    }

    pub fn mount_table(&self) -> &Arc<MountTable> {
        &self.mount_table
    }

    /// Handles one JSON-RPC request. Never fails; errors become error objects.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();

        if req.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            );
        }

        match req.method.as_str() {
            methods::REFRESH_MOUNT_TABLE_ENTRIES => match self.mount_table.reload().await {
                Ok(version) => {
                    info!("Mount table cache refreshed to version {}", version);
                    JsonRpcResponse::success(id, json!(true))
                }
                Err(e) => {
                    warn!("Mount table cache refresh failed: {}", e);
                    JsonRpcResponse::success(id, json!(false))
                }
            },
            methods::INFO => JsonRpcResponse::success(id, self.mount_table.info().await),
            _ => JsonRpcResponse::error(id, JsonRpcError::method_not_found()),
        }
    }
}
