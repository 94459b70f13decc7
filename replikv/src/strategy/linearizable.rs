use labrpc::{anyhow::anyhow, log::warn};

use super::{
    sequential::{Confirm, Sequential},
    Replicator,
};
use crate::{
    config::{Jitter, Mode, ReplicationConfig},
    peers::Peer,
    retry::retry_until_ok,
    task::ReplicationTask,
    PeerRegistry,
};

/// Sequential propagation where a peer only counts as done once a `get` on
/// it returns the value just written (the NULL sentinel after a remove).
/// Until then the whole update-and-read step is retried.
///
/// With `verify_reads` off only the acknowledgement is awaited, which makes
/// this mode indistinguishable from [`Sequential`].
pub struct Linearizable(Sequential);

impl Linearizable {
    /// Starts the worker pushing to `peers`.
    pub fn new(peers: PeerRegistry, config: ReplicationConfig) -> Self {
        let confirm = if config.verify_reads {
            Confirm::ReadBack
        } else {
            warn!("read-back verification is off, linearizable behaves as sequential");
            Confirm::Ack
        };
        Linearizable(Sequential::spawn(peers, config, confirm, Mode::Linearizable))
    }
}

impl Replicator for Linearizable {
    fn replicate(&self, task: ReplicationTask) {
        self.0.replicate(task)
    }

    fn mode(&self) -> Mode {
        Mode::Linearizable
    }
}

/// Delivers `task` to `peer` and reads it back, retrying both until the read
/// matches.
pub(super) async fn deliver_verified(peer: &Peer, task: &ReplicationTask, retry: &Jitter) {
    let target = format!("verified update of {:?} on node {}", task.key(), peer.id);
    let client = &peer.client;
    let id = peer.id;
    retry_until_ok(retry, &target, move || async move {
        task.send_to(client).await?;
        if task.observed_on(client).await? {
            Ok(())
        } else {
            Err(anyhow!(
                "node {} does not read back {:?} for {:?}",
                id,
                task.expected(),
                task.key()
            ))
        }
    })
    .await
}
