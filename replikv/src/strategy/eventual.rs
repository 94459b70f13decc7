use labrpc::tokio;

use super::{deliver, report, Replicator};
use crate::{
    config::{Mode, ReplicationConfig},
    task::ReplicationTask,
    PeerRegistry,
};

/// Every write gets its own propagation task, spawned and never joined.
/// Tasks race each other, so two writes of the same key may reach a peer in
/// either order.
pub struct Eventual {
    peers: PeerRegistry,
    config: ReplicationConfig,
}

impl Eventual {
    /// Replicator pushing to `peers`.
    pub fn new(peers: PeerRegistry, config: ReplicationConfig) -> Self {
        Self { peers, config }
    }
}

impl Replicator for Eventual {
    fn replicate(&self, task: ReplicationTask) {
        let peers = self.peers.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            for peer in peers.iter() {
                deliver(peer, &task, &config.retry).await;
                report(&config, peer, &task);
            }
        });
    }

    fn mode(&self) -> Mode {
        Mode::Eventual
    }
}
