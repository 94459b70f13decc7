use labrpc::{
    log::{debug, error},
    tokio::{
        self,
        sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    },
};

use super::{deliver, linearizable::deliver_verified, report, Replicator};
use crate::{
    config::{Jitter, Mode, ReplicationConfig},
    peers::Peer,
    task::ReplicationTask,
    PeerRegistry,
};

/// How the worker decides a peer has a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Confirm {
    /// The peer acknowledged `update`/`update_remove`.
    Ack,
    /// The peer acknowledged and a following `get` reads the new state.
    ReadBack,
}

impl Confirm {
    async fn deliver(self, peer: &Peer, task: &ReplicationTask, retry: &Jitter) {
        match self {
            Confirm::Ack => deliver(peer, task, retry).await,
            Confirm::ReadBack => deliver_verified(peer, task, retry).await,
        }
    }
}

/// Writes go to an unbounded FIFO queue drained by a single worker, which
/// hands a task to every peer before taking the next one. Peers therefore
/// apply this node's writes in the order they happened here.
pub struct Sequential {
    queue: UnboundedSender<ReplicationTask>,
    mode: Mode,
}

impl Sequential {
    /// Starts the worker pushing to `peers`.
    pub fn new(peers: PeerRegistry, config: ReplicationConfig) -> Self {
        Self::spawn(peers, config, Confirm::Ack, Mode::Sequential)
    }

    pub(super) fn spawn(
        peers: PeerRegistry,
        config: ReplicationConfig,
        confirm: Confirm,
        mode: Mode,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(rx, peers, config, confirm));
        Self { queue: tx, mode }
    }
}

impl Replicator for Sequential {
    fn replicate(&self, task: ReplicationTask) {
        if let Err(e) = self.queue.send(task) {
            error!("update worker has stopped, {:?} will not propagate", e.0);
        }
    }

    fn mode(&self) -> Mode {
        self.mode
    }
}

/// Runs until the owning node, the only producer, is gone and the queue is
/// drained.
async fn worker(
    mut queue: UnboundedReceiver<ReplicationTask>,
    peers: PeerRegistry,
    config: ReplicationConfig,
    confirm: Confirm,
) {
    debug!("update worker started for {} peers", peers.len());
    while let Some(task) = queue.recv().await {
        config.poll.sleep().await;
        for peer in peers.iter() {
            confirm.deliver(peer, &task, &config.retry).await;
            report(&config, peer, &task);
        }
    }
    debug!("update queue closed, worker exiting");
}
