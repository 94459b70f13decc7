use std::{slice, sync::Arc, time::Duration};

use labrpc::{
    anyhow::{ensure, Context, Result},
    client::Client,
    tcp,
};

use crate::{
    config::{ClusterConfig, NodeAddr},
    KvClient,
};

/// Handle to another node.
#[derive(Debug, Clone)]
pub struct Peer {
    /// Peer node id.
    pub id: u32,
    /// RPC handle.
    pub client: KvClient,
}

/// Every other node of the cluster, in configuration order. Fixed once built.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: Arc<Vec<Peer>>,
}

impl PeerRegistry {
    /// Opens one handle per member of `cluster` except `self_id`. Fails if
    /// `self_id` is not a member or any handle cannot be opened.
    pub fn build<F>(cluster: &ClusterConfig, self_id: u32, mut connect: F) -> Result<Self>
    where
        F: FnMut(&NodeAddr) -> Result<KvClient>,
    {
        cluster.validate()?;
        ensure!(
            cluster.get(self_id).is_some(),
            "node {} is not part of the cluster",
            self_id
        );
        let mut peers = Vec::new();
        for node in cluster.nodes.iter().filter(|n| n.node_id != self_id) {
            let client = connect(node).with_context(|| format!("unable to open {}", node))?;
            peers.push(Peer {
                id: node.node_id,
                client,
            });
        }
        Ok(Self::from_peers(peers))
    }

    /// Registry over TCP, each call bounded by `timeout`. Must be called from
    /// within a tokio runtime.
    pub fn over_tcp(cluster: &ClusterConfig, self_id: u32, timeout: Duration) -> Result<Self> {
        Self::build(cluster, self_id, |node| {
            let addr = node.socket_addr()?;
            Ok(KvClient::from_server(addr.to_string(), tcp::connect(addr)).with_timeout(timeout))
        })
    }

    /// Registry over already opened handles.
    pub fn from_peers(peers: Vec<Peer>) -> Self {
        Self {
            peers: Arc::new(peers),
        }
    }

    /// Peers in configuration order.
    pub fn iter(&self) -> slice::Iter<'_, Peer> {
        self.peers.iter()
    }

    /// Number of peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// True for a single-node cluster.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
