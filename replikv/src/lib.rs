#![warn(missing_docs)]
#![deny(clippy::all)]
//! In-memory key-value store replicated across a static cluster under one of
//! three consistency modes: eventual, sequential or linearizable.

labrpc::service! {
    service kv_service {
        fn put(key: String, value: String) -> ();
        fn get(key: String) -> String;
        fn remove(key: String) -> String;
        fn update(key: String, value: String) -> ();
        fn update_remove(key: String) -> ();
    }
}

pub use kv_service::{Client as KvClient, Server as KvServer, Service as KvService};

/// Answer of `get`/`remove` for a key the node does not hold.
pub const NULL: &str = "NULL";

/// Cluster membership and replication settings.
pub mod config;

/// In-memory map owned by one node.
pub mod store;

/// Handles to every other node of the cluster.
pub mod peers;

/// Retry-until-success with jittered delays.
pub mod retry;

/// Mutations waiting to reach peers.
pub mod task;

/// Propagation disciplines, one per consistency mode.
pub mod strategy;

/// KV node service.
pub mod node;

/// TCP listener and process launcher.
pub mod server;

/// Client for a KV cluster.
pub mod client;


pub use config::{ClusterConfig, Jitter, Mode, NodeAddr, ReplicationConfig};
pub use node::KvNode;
pub use peers::{Peer, PeerRegistry};
pub use task::{Delivery, ReplicationTask};
