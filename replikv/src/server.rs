use std::time::Duration;

use labrpc::{
    anyhow::{Context, Result},
    log::info,
    server::Server,
    tcp,
    tokio::{self, net::TcpListener},
};

use crate::{
    config::{ClusterConfig, Mode, ReplicationConfig},
    node::KvNode,
    peers::PeerRegistry,
    KvServer,
};

/// Construction parameters of a node process.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// Address to listen on.
    pub address: String,
    /// Port to listen on.
    pub port: u16,
    /// Identity within the cluster.
    pub node_id: u32,
    /// Consistency mode.
    pub mode: Mode,
    /// Log every operation.
    pub verbose: bool,
    /// Bound of a single call to a peer.
    pub timeout: Duration,
}

/// Serves `node` on `listener` until accepting connections fails.
pub async fn serve(listener: TcpListener, node: KvNode) -> Result<()> {
    let mut server = KvServer::from_service(node);
    let chan = server.client_chan();
    tokio::select! {
        () = server.run() => Ok(()),
        res = tcp::serve(listener, chan) => res,
    }
}

/// Builds node `opts.node_id` of `cluster` with a TCP handle to every peer.
/// Fails if the node is not a member or a peer address cannot be resolved.
pub fn start(opts: &NodeOptions, cluster: &ClusterConfig, config: ReplicationConfig) -> Result<KvNode> {
    let peers = PeerRegistry::over_tcp(cluster, opts.node_id, opts.timeout)?;
    Ok(KvNode::new(opts.node_id, opts.mode, peers, config, opts.verbose))
}

/// Starts node `opts.node_id` of `cluster` on `opts.address:opts.port` and
/// serves it. Nothing is served if the peer set cannot be resolved.
pub async fn launch(opts: NodeOptions, cluster: ClusterConfig, config: ReplicationConfig) -> Result<()> {
    let node = start(&opts, &cluster, config)?;
    let listener = TcpListener::bind((opts.address.as_str(), opts.port))
        .await
        .with_context(|| format!("unable to listen on {}:{}", opts.address, opts.port))?;
    info!(
        "Node {} started on {}:{}! Using {} consistency...",
        opts.node_id, opts.address, opts.port, opts.mode
    );
    if opts.verbose {
        info!("Node {} Verbose Logging Enabled!", opts.node_id);
    } else {
        info!("Node {} Verbose Logging Disabled!", opts.node_id);
    }
    serve(listener, node).await
}
