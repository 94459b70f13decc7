use std::time::Duration;

use labrpc::{
    anyhow::{anyhow, Result},
    client::Client as _,
    network::NetworkPackage,
    server::Server as _,
    tokio, Network, NetworkConfig,
};

labrpc::service! {
    service echo {
        fn say(x: String) -> String;
        fn fail(reason: String) -> ();
        fn count() -> u64;
    }
}

use echo::{Client, Server, Service};

#[derive(Default)]
struct Echo {
    calls: u64,
}

#[labrpc::async_trait]
impl Service for Echo {
    async fn say(&mut self, x: String) -> Result<String> {
        self.calls += 1;
        Ok(x)
    }

    async fn fail(&mut self, reason: String) -> Result<()> {
        self.calls += 1;
        Err(anyhow!(reason))
    }

    async fn count(&mut self) -> Result<u64> {
        Ok(self.calls)
    }
}

fn echo_network() -> (Client, labrpc::NetworkControl) {
    let mut net = Network::new();
    let (client, server) = net.register_service::<Server<Echo>, Client, _, _>("echo", Echo::default);
    let control = net.control();
    tokio::spawn(server);
    tokio::spawn(async move { net.run().await });
    (client.with_timeout(Duration::from_millis(200)), control)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_call_roundtrip() {
    let (client, _) = echo_network();
    assert_eq!(client.say("hello".to_owned()).await.unwrap(), "hello");
    assert_eq!(client.count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handler_error_keeps_server_alive() {
    let (client, _) = echo_network();
    let err = client.fail("boom".to_owned()).await.unwrap_err();
    assert!(err.to_string().contains("boom"));
    // State survived, so the service was not rebuilt.
    assert_eq!(client.say("still here".to_owned()).await.unwrap(), "still here");
    assert_eq!(client.count().await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_undecodable_request_is_dropped() {
    let mut server = Server::from_service(Echo::default());
    let chan = server.client_chan();
    let (reply, mut replies) = tokio::sync::mpsc::channel(1);
    chan.send(NetworkPackage {
        to: "echo".to_owned(),
        reply,
        data: "not a request".to_owned(),
    })
    .await
    .unwrap();
    assert!(server.handle().await.is_err());
    assert!(replies.recv().await.is_none());

    tokio::spawn(async move { server.run().await });
    let client = Client::from_server("echo".to_owned(), chan);
    assert_eq!(client.say("still here".to_owned()).await.unwrap(), "still here");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disconnect_and_reconnect() {
    let (client, control) = echo_network();
    control.disconnect("echo");
    assert!(client.say("lost".to_owned()).await.is_err());
    control.reconnect("echo");
    assert_eq!(client.say("back".to_owned()).await.unwrap(), "back");
    assert_eq!(client.count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unknown_destination_fails() {
    let mut net = Network::new();
    let client: Client = net.client("nobody");
    tokio::spawn(async move { net.run().await });
    assert!(client.say("anyone?".to_owned()).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lossy_network_drops_some_calls() {
    let (client, control) = echo_network();
    control.set_config(NetworkConfig {
        drop_rate: 0.5,
        latency: (Duration::from_millis(1), Duration::from_millis(3)),
    });
    let mut ok = 0;
    for i in 0..40 {
        if client.say(i.to_string()).await.is_ok() {
            ok += 1;
        }
    }
    assert!(ok > 0 && ok < 40, "{} of 40 calls got through", ok);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tcp_transport() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut server = Server::from_service(Echo::default());
    let chan = server.client_chan();
    tokio::spawn(labrpc::tcp::serve(listener, chan));
    tokio::spawn(async move { server.run().await });

    let client = Client::from_server(addr.to_string(), labrpc::tcp::connect(addr));
    assert_eq!(client.say("over the wire".to_owned()).await.unwrap(), "over the wire");
    assert!(client.fail("remote".to_owned()).await.is_err());
    assert_eq!(client.count().await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tcp_unreachable_peer_fails() {
    // Reserve a port, then close it again.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = Client::from_server(addr.to_string(), labrpc::tcp::connect(addr))
        .with_timeout(Duration::from_millis(500));
    assert!(client.say("hello?".to_owned()).await.is_err());
}
