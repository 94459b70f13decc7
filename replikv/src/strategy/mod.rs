//! A node applies every write to its own store first and then hands the
//! mutation to its [`Replicator`], which alone decides how and when peers see
//! it. Propagation never re-forwards: peers apply `update`/`update_remove`
//! locally and stop there.

use labrpc::log::warn;

use crate::{
    config::{Jitter, Mode, ReplicationConfig},
    peers::Peer,
    retry::retry_until_ok,
    task::{Delivery, ReplicationTask},
    PeerRegistry,
};

mod eventual;
mod linearizable;
mod sequential;

pub use eventual::Eventual;
pub use linearizable::Linearizable;
pub use sequential::Sequential;

/// Propagation discipline of a node.
pub trait Replicator: Send + Sync {
    /// Schedules `task` for delivery to every peer. Never blocks on peers.
    fn replicate(&self, task: ReplicationTask);

    /// Consistency mode implemented.
    fn mode(&self) -> Mode;
}

/// Builds the replicator for `mode`. Spawns background tasks, so it must be
/// called from within a tokio runtime.
pub fn build(mode: Mode, peers: PeerRegistry, config: ReplicationConfig) -> Box<dyn Replicator> {
    match mode {
        Mode::Eventual => Box::new(Eventual::new(peers, config)),
        Mode::Sequential => Box::new(Sequential::new(peers, config)),
        Mode::Linearizable => Box::new(Linearizable::new(peers, config)),
    }
}

/// Delivers `task` to `peer`, retrying until the peer acknowledges it.
async fn deliver(peer: &Peer, task: &ReplicationTask, retry: &Jitter) {
    let target = format!("update of {:?} on node {}", task.key(), peer.id);
    let client = &peer.client;
    retry_until_ok(retry, &target, move || task.send_to(client)).await
}

fn report(config: &ReplicationConfig, peer: &Peer, task: &ReplicationTask) {
    if let Some(tx) = config.observer.as_ref() {
        let d = Delivery {
            peer: peer.id,
            task: task.clone(),
        };
        if tx.send(d).is_err() {
            warn!("delivery observer is gone");
        }
    }
}
