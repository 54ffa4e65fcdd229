//! HTTP Transport Utilities
//!
//! - Parsing JSON-RPC requests from HTTP bodies
//! - Creating HTTP responses from JSON-RPC responses
//! - Building the endpoint URL for an admin address

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};

use crate::protocol::error::{RefreshError, Result};
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Type alias for Hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Parse a JSON-RPC request from an HTTP body
    ///
    /// # Example
    ///
    /// ```
    /// use mtrefresh_common::transport::http::HttpTransport;
    /// use hyper::body::Bytes;
    ///
    /// let body = Bytes::from(r#"{"jsonrpc":"2.0","method":"_info","params":{},"id":1}"#);
    /// let request = HttpTransport::parse_jsonrpc(body).unwrap();
    /// assert_eq!(request.method, "_info");
    /// ```
    pub fn parse_jsonrpc(body: Bytes) -> Result<JsonRpcRequest> {
        serde_json::from_slice(&body).map_err(RefreshError::JsonSerialization)
    }

    /// Parse a JSON-RPC response from an HTTP body
    pub fn parse_jsonrpc_response(body: &[u8]) -> Result<JsonRpcResponse> {
        serde_json::from_slice(body).map_err(RefreshError::JsonSerialization)
    }

    /// Create an HTTP response from a JSON-RPC response
    pub fn to_http_response(jsonrpc: JsonRpcResponse) -> HyperResponse {
        Self::to_http_response_with_status(jsonrpc, StatusCode::OK)
    }

    /// Create an HTTP error response from a JSON-RPC error
    pub fn to_http_error(id: serde_json::Value, error: JsonRpcError) -> HyperResponse {
        Self::to_http_response(JsonRpcResponse::error(id, error))
    }

    /// Create an HTTP response with a custom status code
    pub fn to_http_response_with_status(
        jsonrpc: JsonRpcResponse,
        status: StatusCode,
    ) -> HyperResponse {
        let body = serde_json::to_vec(&jsonrpc).unwrap_or_default();

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static("application/json"),
        );
        response
    }

    /// Builds the URL of an admin endpoint.
    ///
    /// Addresses are normally `host:port`; an address that already carries
    /// an `http://` or `https://` scheme is used as-is.
    pub fn endpoint_url(addr: &str) -> String {
        if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{}/", addr)
        }
    }
}
