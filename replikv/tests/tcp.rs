use std::time::Duration;

use labrpc::{client::Client as _, tcp, tokio, tokio::net::TcpListener};
use replikv::{
    client::Client,
    server::{self, NodeOptions},
    ClusterConfig, KvClient, Mode, NodeAddr, ReplicationConfig, NULL,
};

const SETTLE: Duration = Duration::from_secs(10);

fn options(node: &NodeAddr, mode: Mode) -> NodeOptions {
    NodeOptions {
        address: node.address.clone(),
        port: node.port,
        node_id: node.node_id,
        mode,
        verbose: true,
        timeout: Duration::from_millis(500),
    }
}

/// Starts three nodes on loopback ports picked by the OS.
async fn tcp_cluster(mode: Mode) -> Client {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut listeners = Vec::new();
    let mut nodes = Vec::new();
    for id in 1..=3 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        nodes.push(NodeAddr {
            address: "127.0.0.1".to_owned(),
            port: listener.local_addr().unwrap().port(),
            node_id: id,
        });
        listeners.push(listener);
    }
    let cluster = ClusterConfig::new(nodes).unwrap();

    let mut clients = Vec::new();
    for (listener, node) in listeners.into_iter().zip(cluster.nodes.iter()) {
        let kv = server::start(&options(node, mode), &cluster, ReplicationConfig::fast()).unwrap();
        tokio::spawn(server::serve(listener, kv));

        let addr = node.socket_addr().unwrap();
        clients.push((node.node_id, KvClient::from_server(addr.to_string(), tcp::connect(addr))));
    }
    Client::new(clients)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_tcp_cluster_converges() {
    for mode in Mode::ALL.iter().copied() {
        let c = tcp_cluster(mode).await;
        c.put(1, "a", "1").await.unwrap();
        c.put(1, "a", "2").await.unwrap();
        c.put(1, "b", "x").await.unwrap();
        assert_eq!(c.get(1, "a").await.unwrap(), "2");

        assert!(c.wait_for_all("b", "x", SETTLE).await.unwrap(), "{}", mode);
        if mode != Mode::Eventual {
            // b was written after a, so a is settled wherever b is.
            for id in 2..=3 {
                assert_eq!(c.get(id, "a").await.unwrap(), "2", "{}", mode);
            }
        }

        assert_eq!(c.remove(1, "b").await.unwrap(), "x");
        assert!(c.wait_for_all("b", NULL, SETTLE).await.unwrap(), "{}", mode);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_launch_rejects_unknown_node() {
    let node = NodeAddr {
        address: "127.0.0.1".to_owned(),
        port: 0,
        node_id: 9,
    };
    let res = server::launch(options(&node, Mode::Sequential), ClusterConfig::local(), ReplicationConfig::fast()).await;
    assert!(res.is_err());
}
