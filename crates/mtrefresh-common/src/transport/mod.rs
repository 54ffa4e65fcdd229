//! HTTP Transport Utilities
//!
//! Conversion between HTTP bodies and JSON-RPC messages, shared by the admin
//! server and the admin client.

pub mod http;

pub use http::{HttpTransport, HyperRequest, HyperResponse};
