//! HTTP Server for the router admin endpoint
//!
//! - Listens on a TCP socket for incoming HTTP connections
//! - Spawns a tokio task for each connection
//! - Parses JSON-RPC requests from HTTP bodies
//! - Forwards requests to the [`AdminRouter`]
//!
//! # Example
//!
//! ```no_run
//! use mtrefresh_admin::AdminServer;
//! use mtrefresh_common::MountTable;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let table = Arc::new(MountTable::from_file("mount-table.json"));
//!     let server = AdminServer::new(table);
//!     server.run("127.0.0.1:8111".parse().unwrap()).await.unwrap();
//! }
//! ```

use http_body_util::BodyExt;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use mtrefresh_common::protocol::error::{RefreshError, Result};
use mtrefresh_common::protocol::{JsonRpcError, JsonRpcResponse};
use mtrefresh_common::transport::{HttpTransport, HyperRequest, HyperResponse};
use mtrefresh_common::MountTable;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::http_router::AdminRouter;

/// HTTP server for a router admin endpoint.
pub struct AdminServer {
    router: Arc<AdminRouter>,
}

impl AdminServer {
    pub fn new(mount_table: Arc<MountTable>) -> Self {
        Self {
            router: Arc::new(AdminRouter::new(mount_table)),
        }
    }

    /// Binds `addr` and serves until the process exits.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RefreshError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener, std::future::pending()).await
    }

    /// Serves connections from `listener` until `shutdown` completes.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| RefreshError::Transport(format!("Failed to get local address: {}", e)))?;
        tracing::info!("Admin server listening on {}", local_addr);

        tokio::pin!(shutdown);

        loop {
            let (stream, _) = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Admin server on {} shutting down", local_addr);
                    return Ok(());
                }
                accepted = listener.accept() => accepted.map_err(|e| {
                    RefreshError::Transport(format!("Failed to accept connection: {}", e))
                })?,
            };

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = router.clone();
                    async move { Self::handle_request(router, req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("Error serving connection: {}", err);
                }
            });
        }
    }

    async fn handle_request(
        router: Arc<AdminRouter>,
        req: HyperRequest,
    ) -> std::result::Result<HyperResponse, RefreshError> {
        if req.method() != hyper::Method::POST {
            return Ok(HttpTransport::to_http_response_with_status(
                JsonRpcResponse::error(
                    json!(null),
                    JsonRpcError::invalid_request("Only POST requests are supported"),
                ),
                StatusCode::METHOD_NOT_ALLOWED,
            ));
        }

        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| RefreshError::Transport(format!("Failed to read request body: {}", e)))?
            .to_bytes();

        let jsonrpc_req = match HttpTransport::parse_jsonrpc(body) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!("Failed to parse JSON-RPC request: {}", e);
                return Ok(HttpTransport::to_http_error(
                    json!(null),
                    JsonRpcError::parse_error(),
                ));
            }
        };

        let jsonrpc_res = router.handle_request(jsonrpc_req).await;
        Ok(HttpTransport::to_http_response(jsonrpc_res))
    }
}
