//! mtrefresh Admin
//!
//! Router-side admin endpoint. Each router runs one of these next to its
//! mount table cache; the refresher calls it to make the router reload.
//!
//! - [`AdminRouter`]: dispatches JSON-RPC methods onto a [`MountTable`]
//! - [`AdminServer`]: hyper HTTP/1.1 server carrying the router
//!
//! [`MountTable`]: mtrefresh_common::MountTable

pub mod http_router;
pub mod http_server;

pub use http_router::AdminRouter;
pub use http_server::AdminServer;
