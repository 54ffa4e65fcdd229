// Copyright 2025 mtrefresh Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{AdminClient, ClientConfig};

/// Cache of admin clients keyed by admin address (`host:port`).
///
/// Clients are created lazily on first lookup, so resolving an address never
/// performs I/O. A node that fails a refresh has its client invalidated and
/// the next lookup builds a fresh one.
///
/// # Example
///
/// ```rust,no_run
/// use mtrefresh_client::{ClientConfig, RouterClientCache};
///
/// let cache = RouterClientCache::new(ClientConfig::default());
/// let first = cache.get("router1:8111");
/// assert!(cache.contains("router1:8111"));
///
/// cache.invalidate("router1:8111");
/// let second = cache.get("router1:8111");
/// assert!(!std::sync::Arc::ptr_eq(&first, &second));
/// ```
pub struct RouterClientCache {
    clients: RwLock<HashMap<String, Arc<AdminClient>>>,
    config: ClientConfig,
}

impl RouterClientCache {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Returns the cached client for `addr`, creating it if absent.
    pub fn get(&self, addr: &str) -> Arc<AdminClient> {
        if let Some(client) = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(addr)
        {
            return client.clone();
        }

        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        clients
            .entry(addr.to_string())
            .or_insert_with(|| Arc::new(AdminClient::new(addr, self.config.clone())))
            .clone()
    }

    /// Discards the client for `addr`. Returns whether one was cached.
    ///
    /// Callers already holding the old `Arc` keep using it until they drop it.
    pub fn invalidate(&self, addr: &str) -> bool {
        let removed = self
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(addr)
            .is_some();
        if removed {
            tracing::debug!("Invalidated cached admin client for {}", addr);
        }
        removed
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RouterClientCache {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_reuses_client() {
        let cache = RouterClientCache::default();
        let a = cache.get("router1:8111");
        let b = cache.get("router1:8111");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_clients_are_per_address() {
        let cache = RouterClientCache::default();
        let a = cache.get("router1:8111");
        let b = cache.get("router2:8111");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.addr(), "router2:8111");
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_client() {
        let cache = RouterClientCache::default();
        let before = cache.get("router1:8111");

        assert!(cache.invalidate("router1:8111"));
        assert!(!cache.contains("router1:8111"));
        assert!(cache.is_empty());

        let after = cache.get("router1:8111");
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_invalidate_unknown_address() {
        let cache = RouterClientCache::default();
        assert!(!cache.invalidate("never-seen:1"));
    }

    #[tokio::test]
    async fn test_concurrent_get_and_invalidate() {
        let cache = Arc::new(RouterClientCache::default());
        let mut handles = Vec::new();

        for i in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    let addr = format!("router{}:8111", i % 3);
                    let _ = cache.get(&addr);
                    cache.invalidate(&addr);
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(cache.len() <= 3);
    }
}
