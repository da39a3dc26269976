// src/client/pool.rs
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

use super::{ClientError, ClusterClient};
use crate::session::ActiveProfile;

#[derive(Debug, Default)]
struct Cached {
    generation: u64,
    clients: HashMap<String, ClusterClient>,
}

/// Clients built for the current profile generation, one per cluster.
#[derive(Debug)]
pub struct ClientPool {
    timeout: Duration,
    cache: RwLock<Cached>,
}

impl ClientPool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cache: RwLock::new(Cached::default()),
        }
    }

    /// Client for the snapshot's selected cluster.
    ///
    /// A snapshot newer than the cache drops every cached client. Clients for
    /// an older snapshot are built but not kept.
    pub fn client_for(&self, active: &ActiveProfile) -> Result<ClusterClient, ClientError> {
        let cluster = active.current_cluster();
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if cache.generation == active.generation {
                if let Some(client) = cache.clients.get(&cluster.name) {
                    return Ok(client.clone());
                }
            }
        }

        let client = ClusterClient::new(cluster, self.timeout)?;

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if active.generation > cache.generation {
            debug!(
                from = cache.generation,
                to = active.generation,
                "profile replaced, dropping cached clients"
            );
            cache.generation = active.generation;
            cache.clients.clear();
        }
        if active.generation == cache.generation {
            cache.clients.insert(cluster.name.clone(), client.clone());
        }
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clients
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ProfileStore, Session};
    use tempfile::tempdir;

    const PROFILE: &str = r#"
current-context: a
contexts:
  - name: a
    context: { cluster: alpha, user: u }
  - name: b
    context: { cluster: beta, user: u }
clusters:
  - name: alpha
    cluster: { server: "http://alpha:2381" }
  - name: beta
    cluster: { server: "http://beta:2381" }
users:
  - name: u
"#;

    #[test]
    fn caches_per_cluster_until_replacement() {
        let dir = tempdir().unwrap();
        let (session, _) = Session::bootstrap(ProfileStore::new(dir.path().join("rc.yaml")));
        let pool = ClientPool::new(Duration::from_secs(1));

        let builtin = session.snapshot();
        assert_eq!(pool.client_for(&builtin).unwrap().name(), "cluster-default");
        assert_eq!(pool.len(), 1);

        let replaced = session.replace(PROFILE).unwrap();
        let client = pool.client_for(&replaced).unwrap();
        assert_eq!(client.base_url(), "http://alpha:2381");
        assert_eq!(pool.len(), 1);

        let selected = session.select("beta").unwrap();
        assert_eq!(pool.client_for(&selected).unwrap().name(), "beta");
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn stale_snapshots_are_not_cached() {
        let dir = tempdir().unwrap();
        let (session, _) = Session::bootstrap(ProfileStore::new(dir.path().join("rc.yaml")));
        let pool = ClientPool::new(Duration::from_secs(1));

        let stale = session.snapshot();
        let fresh = session.replace(PROFILE).unwrap();
        pool.client_for(&fresh).unwrap();

        assert_eq!(pool.client_for(&stale).unwrap().name(), "cluster-default");
        assert_eq!(pool.len(), 1);
    }
}
