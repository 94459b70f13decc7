use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::Future;
use log::{debug, warn};
use rand::Rng;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::{client::Client, server::Server};

#[derive(Debug, Clone)]
pub struct NetworkPackage {
    pub to: String,
    pub reply: Sender<String>,
    pub data: String,
}

/// Faults applied by the router to every package.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Probability of dropping a package (0.0 - 1.0).
    pub drop_rate: f64,
    /// Range of latency injected before delivery.
    pub latency: (Duration, Duration),
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            drop_rate: 0.0,
            latency: (Duration::ZERO, Duration::ZERO),
        }
    }
}

impl NetworkConfig {
    fn should_drop(&self) -> bool {
        self.drop_rate > 0.0 && rand::thread_rng().gen_bool(self.drop_rate.min(1.0))
    }

    fn sample_latency(&self) -> Duration {
        let (lo, hi) = self.latency;
        if hi <= lo {
            return lo;
        }
        rand::thread_rng().gen_range(lo..=hi)
    }
}

/// Handle to change network conditions while `Network::run` is routing.
#[derive(Debug, Clone, Default)]
pub struct NetworkControl {
    config: Arc<Mutex<NetworkConfig>>,
    down: Arc<Mutex<HashSet<String>>>,
}

impl NetworkControl {
    pub fn set_config(&self, config: NetworkConfig) {
        *self.config.lock().unwrap() = config;
    }

    /// Every package addressed to `id` is dropped until `reconnect`.
    pub fn disconnect(&self, id: &str) {
        self.down.lock().unwrap().insert(id.to_owned());
    }

    pub fn reconnect(&self, id: &str) {
        self.down.lock().unwrap().remove(id);
    }

    fn is_down(&self, id: &str) -> bool {
        self.down.lock().unwrap().contains(id)
    }
}

pub struct Network {
    pub tx: Sender<NetworkPackage>,
    rx: Receiver<NetworkPackage>,
    pub nodes: Arc<Mutex<HashMap<String, Sender<NetworkPackage>>>>,
    control: NetworkControl,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self {
            tx,
            rx,
            nodes: Arc::new(Mutex::new(HashMap::default())),
            control: NetworkControl::default(),
        }
    }

    pub fn control(&self) -> NetworkControl {
        self.control.clone()
    }

    /// Client handle addressed to `id`, which may be registered later.
    pub fn client<C: Client>(&self, id: impl Into<String>) -> C {
        C::from_server(id.into(), self.tx.clone())
    }

    /// Registers the service built by `f` under `id` right away. The returned
    /// future serves it.
    pub fn register_service<S, C, F, V>(
        &self,
        id: impl Into<String>,
        f: F,
    ) -> (C, impl Future<Output = ()>)
    where
        F: FnOnce() -> V,
        S: Server<Service = V> + Send + 'static,
        C: Client,
    {
        let id = id.into();
        let client = self.client(id.clone());
        let mut server = S::from_service(f());
        self.nodes.lock().unwrap().insert(id, server.client_chan());
        (client, async move { server.run().await })
    }

    pub async fn run(&mut self) {
        loop {
            let p = self
                .rx
                .recv()
                .await
                .expect("sender cannot be dropped by itself");
            let node = {
                let x = self.nodes.lock().unwrap();
                x.get(&p.to).cloned()
            };
            let node = match node {
                Some(x) => x,
                None => {
                    warn!("node {} not found", p.to);
                    continue;
                }
            };
            if self.control.is_down(&p.to) {
                debug!("node {} is disconnected, dropped", p.to);
                continue;
            }

            let (dropped, delay) = {
                let config = self.control.config.lock().unwrap();
                (config.should_drop(), config.sample_latency())
            };
            if dropped {
                debug!("package to {} dropped", p.to);
                continue;
            }
            if delay.is_zero() {
                if node.send(p).await.is_err() {
                    warn!("send to node failed, dropped");
                }
            } else {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if node.send(p).await.is_err() {
                        warn!("send to node failed, dropped");
                    }
                });
            }
        }
    }
}
