//! mtrefresh Client
//!
//! HTTP JSON-RPC client for router admin endpoints and the per-address
//! client cache the refresher draws from.
//!
//! - [`AdminClient`]: talks to one admin endpoint
//! - [`RouterClientCache`]: address → client map; failed nodes are
//!   invalidated so the next cycle builds a fresh client

pub mod cache;
pub mod client;

pub use cache::RouterClientCache;
pub use client::{AdminClient, ClientConfig};
