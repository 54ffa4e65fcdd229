use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrative address of a router (`host:port`).
///
/// Only non-blank addresses can be constructed; a router without one is
/// not eligible for refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeAddress(String);

impl NodeAddress {
    /// Returns `None` for an absent or blank address.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some(addr) if !addr.trim().is_empty() => Some(Self(addr.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address names the router this process runs in.
    pub fn is_local(&self, marker: &str) -> bool {
        self.0.contains(marker)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A router record as held by the node store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterState {
    #[serde(default)]
    pub admin_address: Option<String>,
}

impl RouterState {
    pub fn new(admin_address: impl Into<String>) -> Self {
        Self {
            admin_address: Some(admin_address.into()),
        }
    }

    /// A record with no admin endpoint.
    pub fn without_admin() -> Self {
        Self {
            admin_address: None,
        }
    }

    pub fn admin_address(&self) -> Option<&str> {
        self.admin_address.as_deref()
    }
}
