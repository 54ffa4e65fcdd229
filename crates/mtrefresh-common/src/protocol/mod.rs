pub mod error;
pub mod jsonrpc;

pub use error::{RefreshError, Result};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, methods};
