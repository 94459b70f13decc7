use super::KvService;

use labrpc::{anyhow::Result, log::info};

use crate::{
    config::{Mode, ReplicationConfig},
    peers::PeerRegistry,
    store::LocalStore,
    strategy::{self, Replicator},
    task::ReplicationTask,
    NULL,
};

/// One replica. Owns its store exclusively; peers only reach it through RPC.
pub struct KvNode {
    id: u32,
    store: LocalStore,
    replicator: Box<dyn Replicator>,
    verbose: bool,
}

impl KvNode {
    /// Creates node `id` replicating to `peers` under `mode`. Must be called
    /// from within a tokio runtime.
    pub fn new(
        id: u32,
        mode: Mode,
        peers: PeerRegistry,
        config: ReplicationConfig,
        verbose: bool,
    ) -> Self {
        Self::with_replicator(id, strategy::build(mode, peers, config), verbose)
    }

    /// Creates a node around an existing replicator.
    pub fn with_replicator(id: u32, replicator: Box<dyn Replicator>, verbose: bool) -> Self {
        Self {
            id,
            store: LocalStore::new(),
            replicator,
            verbose,
        }
    }

    /// Node id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Consistency mode.
    pub fn mode(&self) -> Mode {
        self.replicator.mode()
    }

    /// Local data.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }
}

#[labrpc::async_trait]
impl KvService for KvNode {
    async fn put(&mut self, key: String, value: String) -> Result<()> {
        if self.verbose {
            info!("Node {} -> Key {}, Value {}", self.id, key, value);
        }
        self.store.put(key.clone(), value.clone());
        self.replicator.replicate(ReplicationTask::Put { key, value });
        Ok(())
    }

    async fn get(&mut self, key: String) -> Result<String> {
        if self.verbose {
            info!("Node {} GET -> Key {}", self.id, key);
        }
        Ok(self.store.get(&key).unwrap_or(NULL).to_owned())
    }

    async fn remove(&mut self, key: String) -> Result<String> {
        if self.verbose {
            info!("Node {} Remove! -> Key {}", self.id, key);
        }
        match self.store.remove(&key) {
            Some(value) => {
                self.replicator.replicate(ReplicationTask::Remove { key });
                Ok(value)
            }
            None => Ok(NULL.to_owned()),
        }
    }

    /// Applied as is; never propagated further.
    async fn update(&mut self, key: String, value: String) -> Result<()> {
        if self.verbose {
            info!("Node {} Updated! -> Key {}, Value {}", self.id, key, value);
        }
        self.store.put(key, value);
        Ok(())
    }

    async fn update_remove(&mut self, key: String) -> Result<()> {
        if self.verbose {
            info!("Node {} Updated Remove! -> Key {}", self.id, key);
        }
        self.store.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labrpc::tokio;
    use std::sync::{Arc, Mutex};

    /// Remembers what it was asked to replicate.
    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<ReplicationTask>>>);

    impl Replicator for Recorder {
        fn replicate(&self, task: ReplicationTask) {
            self.0.lock().unwrap().push(task);
        }

        fn mode(&self) -> Mode {
            Mode::Sequential
        }
    }

    fn node() -> (KvNode, Recorder) {
        let rec = Recorder::default();
        (KvNode::with_replicator(1, Box::new(rec.clone()), true), rec)
    }

    fn put(key: &str, value: &str) -> ReplicationTask {
        ReplicationTask::Put {
            key: key.to_owned(),
            value: value.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (mut n, rec) = node();
        n.put("a".into(), "1".into()).await.unwrap();
        assert_eq!(n.get("a".into()).await.unwrap(), "1");
        assert_eq!(n.get("b".into()).await.unwrap(), NULL);
        assert_eq!(*rec.0.lock().unwrap(), vec![put("a", "1")]);
    }

    #[tokio::test]
    async fn test_remove_replicates_only_present_keys() {
        let (mut n, rec) = node();
        assert_eq!(n.remove("a".into()).await.unwrap(), NULL);
        assert!(rec.0.lock().unwrap().is_empty());

        n.put("a".into(), "1".into()).await.unwrap();
        assert_eq!(n.remove("a".into()).await.unwrap(), "1");
        assert_eq!(n.get("a".into()).await.unwrap(), NULL);
        assert_eq!(
            *rec.0.lock().unwrap(),
            vec![put("a", "1"), ReplicationTask::Remove { key: "a".into() }]
        );
    }

    #[tokio::test]
    async fn test_updates_are_not_replicated() {
        let (mut n, rec) = node();
        n.update("a".into(), "1".into()).await.unwrap();
        n.update("a".into(), "1".into()).await.unwrap();
        assert_eq!(n.store().len(), 1);
        assert_eq!(n.get("a".into()).await.unwrap(), "1");

        n.update_remove("a".into()).await.unwrap();
        n.update_remove("a".into()).await.unwrap();
        assert!(n.store().is_empty());
        assert!(rec.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_value_is_not_null() {
        let (mut n, _) = node();
        n.put("k".into(), String::new()).await.unwrap();
        assert_eq!(n.get("k".into()).await.unwrap(), "");
        assert_eq!(n.mode(), Mode::Sequential);
        assert_eq!(n.id(), 1);
    }
}
