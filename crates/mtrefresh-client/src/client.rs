use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use mtrefresh_common::protocol::error::{RefreshError, Result};
use mtrefresh_common::protocol::{methods, JsonRpcRequest};
use mtrefresh_common::transport::HttpTransport;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Admin client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound for a single HTTP round trip
    ///
    /// Default: 30 seconds
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Client for one router admin endpoint.
///
/// Construction performs no I/O; every call opens (or reuses) an HTTP/1.1
/// connection from hyper's connection pool.
pub struct AdminClient {
    addr: String,
    url: String,
    http: Client<HttpConnector, Full<Bytes>>,
    config: ClientConfig,
    next_id: AtomicU64,
}

impl AdminClient {
    /// Creates a client bound to `addr` (`host:port` or a full URL).
    pub fn new(addr: impl Into<String>, config: ClientConfig) -> Self {
        let addr = addr.into();
        let url = HttpTransport::endpoint_url(&addr);
        let http = Client::builder(TokioExecutor::new()).build_http();

        Self {
            addr,
            url,
            http,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// The admin address this client is bound to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Asks the router to reload its mount table cache.
    ///
    /// # Returns
    /// - `Ok(true)` - the router reloaded its cache
    /// - `Ok(false)` - the router answered but declined
    /// - `Err(...)` - transport failure, timeout, or a non-boolean answer
    pub async fn refresh_mount_table_entries(&self) -> Result<bool> {
        let result = self
            .call(methods::REFRESH_MOUNT_TABLE_ENTRIES, json!({}))
            .await?;

        result.as_bool().ok_or_else(|| {
            RefreshError::InvalidResponse(format!(
                "{} answered {} with non-boolean result: {}",
                self.addr,
                methods::REFRESH_MOUNT_TABLE_ENTRIES,
                result
            ))
        })
    }

    /// Fetches the router's mount table summary.
    pub async fn info(&self) -> Result<Value> {
        self.call(methods::INFO, json!({})).await
    }

    /// Sends a JSON-RPC request and returns its result value.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, params, json!(id));
        let body = serde_json::to_vec(&request)?;

        let http_request = Request::builder()
            .method("POST")
            .uri(&self.url)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| RefreshError::Transport(format!("Failed to build request: {}", e)))?;

        let timeout = self.config.request_timeout;
        let exchange = async {
            let response = self
                .http
                .request(http_request)
                .await
                .map_err(|e| {
                    RefreshError::Transport(format!("HTTP request to {} failed: {}", self.addr, e))
                })?;

            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| RefreshError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();

            if !status.is_success() {
                return Err(RefreshError::NodeUnavailable(format!(
                    "{} returned HTTP {}",
                    self.addr, status
                )));
            }

            Ok::<_, RefreshError>(body)
        };

        let body = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| RefreshError::Timeout(timeout.as_millis() as u64))??;

        HttpTransport::parse_jsonrpc_response(&body)?.into_result()
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("addr", &self.addr)
            .field("url", &self.url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_client_creation_does_no_io() {
        let client = AdminClient::new("203.0.113.1:8111", ClientConfig::default());
        assert_eq!(client.addr(), "203.0.113.1:8111");
        assert_eq!(client.url, "http://203.0.113.1:8111/");
    }

    #[tokio::test]
    async fn test_refresh_against_closed_port_fails() {
        // Bind and drop to obtain a port with nothing listening on it
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = AdminClient::new(
            addr.to_string(),
            ClientConfig {
                request_timeout: Duration::from_secs(2),
            },
        );
        let result = client.refresh_mount_table_entries().await;
        assert!(matches!(
            result,
            Err(RefreshError::Transport(_)) | Err(RefreshError::Timeout(_))
        ));
    }
}
