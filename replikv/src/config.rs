use std::{
    collections::HashSet,
    fmt,
    fs,
    net::{SocketAddr, ToSocketAddrs},
    path::Path,
    str::FromStr,
    time::Duration,
};

use labrpc::{
    anyhow::{anyhow, ensure, Context, Error, Result},
    tokio::{self, sync::mpsc::UnboundedSender},
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::task::Delivery;

/// Where one node of the cluster listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddr {
    /// Host name or IP address.
    pub address: String,
    /// TCP port.
    pub port: u16,
    /// Identity, unique within the cluster.
    pub node_id: u32,
}

impl NodeAddr {
    /// Resolves `address:port` to the first matching socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.address.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("unable to resolve {}", self))?
            .next()
            .ok_or_else(|| anyhow!("{} resolves to no address", self))
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} at {}:{}", self.node_id, self.address, self.port)
    }
}

/// Static cluster membership, read once at startup. Serialized as a plain
/// JSON array of [`NodeAddr`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterConfig {
    /// Members in configuration order.
    pub nodes: Vec<NodeAddr>,
}

impl ClusterConfig {
    /// Builds a validated configuration.
    pub fn new(nodes: Vec<NodeAddr>) -> Result<Self> {
        let cfg = Self { nodes };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Three nodes on the loopback interface.
    pub fn local() -> Self {
        let nodes = (1..=3)
            .map(|i| NodeAddr {
                address: "127.0.0.1".to_owned(),
                port: 34565 + i as u16,
                node_id: i,
            })
            .collect();
        Self { nodes }
    }

    /// Reads a JSON array of nodes from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("unable to read cluster config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&data)
            .with_context(|| format!("malformed cluster config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects empty clusters and duplicated node ids.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.nodes.is_empty(), "cluster has no nodes");
        let mut seen = HashSet::new();
        for n in self.nodes.iter() {
            ensure!(seen.insert(n.node_id), "node id {} appears twice", n.node_id);
        }
        Ok(())
    }

    /// Looks a member up by id.
    pub fn get(&self, node_id: u32) -> Option<&NodeAddr> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }
}

/// Consistency model of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One unordered propagation task per write.
    Eventual,
    /// FIFO queue drained to every peer in write order.
    Sequential,
    /// Sequential, and each delivery is confirmed by reading it back.
    Linearizable,
}

impl Mode {
    /// All modes, weakest first.
    pub const ALL: [Mode; 3] = [Mode::Eventual, Mode::Sequential, Mode::Linearizable];
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eventual" => Ok(Mode::Eventual),
            "sequential" => Ok(Mode::Sequential),
            "linearizable" => Ok(Mode::Linearizable),
            other => Err(anyhow!(
                "unknown mode {:?}, expected eventual, sequential or linearizable",
                other
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Eventual => "eventual",
            Mode::Sequential => "sequential",
            Mode::Linearizable => "linearizable",
        };
        f.write_str(s)
    }
}

/// Uniformly distributed delay, standing in for network variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    /// Shortest delay.
    pub min: Duration,
    /// Longest delay.
    pub max: Duration,
}

impl Jitter {
    /// Jitter between `min` and `max` milliseconds.
    pub const fn millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    /// No delay at all.
    pub const fn none() -> Self {
        Self::millis(0, 0)
    }

    /// Draws one delay.
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Sleeps for one drawn delay.
    pub async fn sleep(&self) {
        let d = self.sample();
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}

/// How a node propagates its writes.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Delay before every propagation attempt.
    pub retry: Jitter,
    /// Delay the queue worker takes before starting on the next task.
    pub poll: Jitter,
    /// Linearizable mode only: confirm each delivery with a read of the peer.
    /// Without it the mode behaves exactly like sequential.
    pub verify_reads: bool,
    /// Receives a [`Delivery`] every time a task is confirmed on a peer.
    pub observer: Option<UnboundedSender<Delivery>>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            retry: Jitter::millis(200, 1000),
            poll: Jitter::millis(200, 1000),
            verify_reads: true,
            observer: None,
        }
    }
}

impl ReplicationConfig {
    /// Millisecond delays, for tests.
    pub fn fast() -> Self {
        Self {
            retry: Jitter::millis(1, 5),
            poll: Jitter::millis(1, 5),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!("eventual".parse::<Mode>().unwrap(), Mode::Eventual);
        assert_eq!("Sequential".parse::<Mode>().unwrap(), Mode::Sequential);
        assert_eq!("LINEARIZABLE".parse::<Mode>().unwrap(), Mode::Linearizable);
        assert!("causal".parse::<Mode>().is_err());
        for m in Mode::ALL.iter() {
            assert_eq!(m.to_string().parse::<Mode>().unwrap(), *m);
        }
    }

    #[test]
    fn test_load_cluster() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nodes.json");
        fs::write(
            &path,
            r#"[
                {"address": "127.0.0.1", "port": 34566, "node_id": 1},
                {"address": "127.0.0.1", "port": 34567, "node_id": 2},
                {"address": "127.0.0.1", "port": 34568, "node_id": 3}
            ]"#,
        )
        .unwrap();
        let cfg = ClusterConfig::load(&path).unwrap();
        assert_eq!(cfg, ClusterConfig::local());
        assert_eq!(cfg.get(2).unwrap().port, 34567);
        assert!(cfg.get(4).is_none());
    }

    #[test]
    fn test_reject_bad_cluster() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nodes.json");
        fs::write(&path, "[]").unwrap();
        assert!(ClusterConfig::load(&path).is_err());

        fs::write(&path, "{\"nodes\": 3}").unwrap();
        assert!(ClusterConfig::load(&path).is_err());

        assert!(ClusterConfig::load(dir.path().join("missing.json")).is_err());

        let mut nodes = ClusterConfig::local().nodes;
        nodes[2].node_id = 1;
        assert!(ClusterConfig::new(nodes).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = ClusterConfig::local().nodes[0].socket_addr().unwrap();
        assert_eq!(addr, "127.0.0.1:34566".parse().unwrap());
    }

    #[test]
    fn test_jitter_bounds() {
        let j = Jitter::millis(3, 7);
        for _ in 0..100 {
            let d = j.sample();
            assert!(d >= j.min && d <= j.max);
        }
        assert_eq!(Jitter::none().sample(), Duration::ZERO);
        assert_eq!(Jitter::millis(5, 1).sample(), Duration::from_millis(5));
    }
}
