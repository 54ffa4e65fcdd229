//! JSON-RPC 2.0 Protocol Types
//!
//! Router admin endpoints speak JSON-RPC 2.0 over HTTP.
//!
//! - Request format: `{"jsonrpc": "2.0", "method": "...", "params": ..., "id": ...}`
//! - Response format: `{"jsonrpc": "2.0", "result": ..., "error": ..., "id": ...}`
//! - Error format: `{"code": ..., "message": "...", "data": ...}`
//!
//! # Error Codes
//!
//! - `-32700`: Parse error
//! - `-32600`: Invalid request
//! - `-32601`: Method not found
//!
//! # Example
//!
//! ```
//! use mtrefresh_common::protocol::jsonrpc::{methods, JsonRpcRequest, JsonRpcResponse};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new(methods::REFRESH_MOUNT_TABLE_ENTRIES, json!({}), json!(1));
//! let response = JsonRpcResponse::success(request.id.clone(), json!(true));
//! assert_eq!(response.into_result().unwrap(), json!(true));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::error::{RefreshError, Result};

/// Method names understood by a router admin endpoint.
pub mod methods {
    /// Reload the router's mount table cache. Result is a JSON boolean.
    pub const REFRESH_MOUNT_TABLE_ENTRIES: &str = "refreshMountTableEntries";
    /// Describe the router's mount table (entry count, version).
    pub const INFO: &str = "_info";
}

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,
    /// Name of the method to invoke
    pub method: String,
    /// Parameter values
    #[serde(default)]
    pub params: Value,
    /// Request identifier (number, string, or null)
    #[serde(default)]
    pub id: Value,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: Value, id: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 response
///
/// Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;

impl JsonRpcError {
    fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Body was not valid JSON (-32700)
    pub fn parse_error() -> Self {
        Self::with_code(PARSE_ERROR, "Parse error")
    }

    /// Well-formed JSON that is not a usable request (-32600)
    pub fn invalid_request(msg: &str) -> Self {
        Self::with_code(INVALID_REQUEST, msg)
    }

    /// The admin endpoint has no such method (-32601)
    pub fn method_not_found() -> Self {
        Self::with_code(METHOD_NOT_FOUND, "Method not found")
    }
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response
    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Unwraps the response into its result value.
    ///
    /// An error object becomes [`RefreshError::Remote`]; a response carrying
    /// neither field is an [`RefreshError::InvalidResponse`].
    pub fn into_result(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(RefreshError::Remote {
                code: error.code,
                message: error.message,
            });
        }

        self.result
            .ok_or_else(|| RefreshError::InvalidResponse("Response missing result".to_string()))
    }
}
