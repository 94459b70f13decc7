use labrpc::anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{KvClient, NULL};

/// A local mutation not yet confirmed on every peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationTask {
    /// `key` now holds `value`.
    Put {
        /// Key written.
        key: String,
        /// Value written.
        value: String,
    },
    /// `key` was removed.
    Remove {
        /// Key removed.
        key: String,
    },
}

impl ReplicationTask {
    /// Key touched by the mutation.
    pub fn key(&self) -> &str {
        match self {
            ReplicationTask::Put { key, .. } | ReplicationTask::Remove { key } => key,
        }
    }

    /// What `get` on a peer answers once the mutation is applied there.
    pub fn expected(&self) -> &str {
        match self {
            ReplicationTask::Put { value, .. } => value,
            ReplicationTask::Remove { .. } => NULL,
        }
    }

    /// Applies the mutation on `peer` through its propagation endpoint.
    pub async fn send_to(&self, peer: &KvClient) -> Result<()> {
        match self {
            ReplicationTask::Put { key, value } => peer.update(key.clone(), value.clone()).await,
            ReplicationTask::Remove { key } => peer.update_remove(key.clone()).await,
        }
    }

    /// Whether `peer` currently answers reads of the key as if the mutation
    /// was applied.
    pub async fn observed_on(&self, peer: &KvClient) -> Result<bool> {
        let got = peer.get(self.key().to_owned()).await?;
        Ok(got == self.expected())
    }
}

/// One task confirmed on one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Peer node id.
    pub peer: u32,
    /// What was delivered.
    pub task: ReplicationTask,
}
