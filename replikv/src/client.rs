use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use labrpc::{
    anyhow::{anyhow, Result},
    tokio,
};

use super::KvClient;

/// How often `wait_for` polls.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Client for a KV cluster
pub struct Client {
    clients: BTreeMap<u32, KvClient>,
}

impl Client {
    /// Create a new client from a set of clients of kv, keyed by node id
    pub fn new(clients: impl IntoIterator<Item = (u32, KvClient)>) -> Self {
        Self {
            clients: clients.into_iter().collect(),
        }
    }

    /// Handle to node `id`.
    pub fn node(&self, id: u32) -> Result<&KvClient> {
        self.clients
            .get(&id)
            .ok_or_else(|| anyhow!("no node {} in this cluster", id))
    }

    /// Ids of all known nodes.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.clients.keys().copied()
    }

    /// `put` on node `id`.
    pub async fn put(&self, id: u32, key: &str, value: &str) -> Result<()> {
        self.node(id)?.put(key.to_owned(), value.to_owned()).await
    }

    /// `get` on node `id`.
    pub async fn get(&self, id: u32, key: &str) -> Result<String> {
        self.node(id)?.get(key.to_owned()).await
    }

    /// `remove` on node `id`.
    pub async fn remove(&self, id: u32, key: &str) -> Result<String> {
        self.node(id)?.remove(key.to_owned()).await
    }

    /// Polls node `id` until it reads `expected` for `key`. Returns false if
    /// it still does not after `deadline`.
    pub async fn wait_for(&self, id: u32, key: &str, expected: &str, deadline: Duration) -> Result<bool> {
        let node = self.node(id)?;
        let start = Instant::now();
        loop {
            if let Ok(v) = node.get(key.to_owned()).await {
                if v == expected {
                    return Ok(true);
                }
            }
            if start.elapsed() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// `wait_for` on every node.
    pub async fn wait_for_all(&self, key: &str, expected: &str, deadline: Duration) -> Result<bool> {
        for id in self.ids() {
            if !self.wait_for(id, key, expected, deadline).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
