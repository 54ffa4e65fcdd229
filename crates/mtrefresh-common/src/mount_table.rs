//! Router mount table cache.
//!
//! A mount table maps a global path (`src`) onto a path (`dest`) inside a
//! nameservice. Each router keeps its own cached copy; refreshing the cache
//! re-reads the backing file (when there is one) and bumps the version.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::RwLock;

use crate::protocol::error::{RefreshError, Result};

/// A single mount point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    pub src: String,
    pub nameservice: String,
    pub dest: String,
}

#[derive(Debug, Default)]
struct MountTableState {
    entries: Vec<MountEntry>,
    version: u64,
    last_refreshed: Option<SystemTime>,
}

/// Cached mount table of one router.
#[derive(Debug)]
pub struct MountTable {
    /// JSON file holding an array of entries; `None` for a purely in-memory table
    source: Option<PathBuf>,
    state: RwLock<MountTableState>,
}

impl MountTable {
    /// Creates an in-memory table. Reloads keep the entries and bump the version.
    pub fn new(entries: Vec<MountEntry>) -> Self {
        Self {
            source: None,
            state: RwLock::new(MountTableState {
                entries: sorted(entries),
                ..Default::default()
            }),
        }
    }

    /// Creates a table backed by a JSON file. Nothing is read until [`reload`](Self::reload).
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            state: RwLock::new(MountTableState::default()),
        }
    }

    /// Reloads the cache and returns the new version.
    ///
    /// On error the previous entries and version are kept.
    pub async fn reload(&self) -> Result<u64> {
        let fresh = match &self.source {
            Some(path) => {
                let raw = tokio::fs::read(path).await.map_err(|e| {
                    RefreshError::Io(std::io::Error::new(
                        e.kind(),
                        format!("failed to read mount table {}: {}", path.display(), e),
                    ))
                })?;
                let entries: Vec<MountEntry> = serde_json::from_slice(&raw)?;
                Some(sorted(entries))
            }
            None => None,
        };

        let mut state = self.state.write().await;
        if let Some(entries) = fresh {
            state.entries = entries;
        }
        state.version += 1;
        state.last_refreshed = Some(SystemTime::now());

        tracing::debug!(
            "Mount table reloaded: version={}, entries={}",
            state.version,
            state.entries.len()
        );
        Ok(state.version)
    }

    pub async fn entries(&self) -> Vec<MountEntry> {
        self.state.read().await.entries.clone()
    }

    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    /// Summary served by the admin `_info` method.
    pub async fn info(&self) -> serde_json::Value {
        let state = self.state.read().await;
        let last_refreshed_ms = state.last_refreshed.and_then(|t| {
            t.duration_since(SystemTime::UNIX_EPOCH)
                .ok()
                .map(|d| d.as_millis() as u64)
        });
        json!({
            "version": state.version,
            "entries": state.entries.len(),
            "last_refreshed_ms": last_refreshed_ms,
            "source": self.source.as_ref().map(|p| p.display().to_string()),
        })
    }
}

fn sorted(mut entries: Vec<MountEntry>) -> Vec<MountEntry> {
    entries.sort_by(|a, b| a.src.cmp(&b.src));
    entries
}
