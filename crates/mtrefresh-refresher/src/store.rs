//! Sources of router records.
//!
//! The refresher asks the store for the current records at the start of
//! every cycle, so membership changes take effect on the next cycle.

use async_trait::async_trait;
use mtrefresh_common::protocol::error::{RefreshError, Result};
use std::path::PathBuf;

use crate::node::RouterState;

#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Current router records, in a stable order.
    async fn cached_records(&self) -> Result<Vec<RouterState>>;
}

/// Fixed list of routers.
#[derive(Debug, Clone, Default)]
pub struct StaticNodeStore {
    records: Vec<RouterState>,
}

impl StaticNodeStore {
    pub fn new(records: Vec<RouterState>) -> Self {
        Self { records }
    }

    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(addresses.into_iter().map(RouterState::new).collect())
    }
}

#[async_trait]
impl NodeStore for StaticNodeStore {
    async fn cached_records(&self) -> Result<Vec<RouterState>> {
        Ok(self.records.clone())
    }
}

/// Routers listed in a JSON file, re-read on every call.
///
/// ```json
/// [{"adminAddress": "router1:8111"}, {"adminAddress": "router2:8111"}]
/// ```
#[derive(Debug, Clone)]
pub struct FileNodeStore {
    path: PathBuf,
}

impl FileNodeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl NodeStore for FileNodeStore {
    async fn cached_records(&self) -> Result<Vec<RouterState>> {
        let raw = tokio::fs::read(&self.path).await.map_err(|e| {
            RefreshError::NodeStore(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_slice(&raw).map_err(|e| {
            RefreshError::NodeStore(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_store() {
        let store = StaticNodeStore::from_addresses(["a:1", "b:2"]);
        let records = store.cached_records().await.unwrap();
        assert_eq!(records, vec![RouterState::new("a:1"), RouterState::new("b:2")]);
    }

    #[tokio::test]
    async fn test_file_store_rereads_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"[{"adminAddress":"r1:8111"}]"#).unwrap();
        let store = FileNodeStore::new(file.path());

        assert_eq!(store.cached_records().await.unwrap().len(), 1);

        std::fs::write(
            file.path(),
            r#"[{"adminAddress":"r1:8111"},{"adminAddress":"r2:8111"},{"adminAddress":""}]"#,
        )
        .unwrap();
        let records = store.cached_records().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].admin_address(), Some("r2:8111"));
    }

    #[tokio::test]
    async fn test_file_store_errors() {
        let missing = FileNodeStore::new("/nonexistent/routers.json");
        assert!(matches!(
            missing.cached_records().await,
            Err(RefreshError::NodeStore(_))
        ));

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{not json").unwrap();
        let broken = FileNodeStore::new(file.path());
        assert!(matches!(
            broken.cached_records().await,
            Err(RefreshError::NodeStore(_))
        ));
    }
}
