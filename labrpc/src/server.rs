use crate::network::NetworkPackage;
use anyhow::Result;
use log::warn;
use tokio::sync::mpsc::Sender;

/// Server half of a `service!`. Requests come in through `client_chan`,
/// either routed by a `Network` or read off a socket by `tcp::serve`.
#[async_trait::async_trait]
pub trait Server {
    type Service;
    fn from_service(svc: Self::Service) -> Self;
    fn client_chan(&self) -> Sender<NetworkPackage>;
    /// Serves the next request. An error means that request went unanswered,
    /// e.g. it could not be decoded. A handler error is a reply, not an error.
    async fn handle(&mut self) -> Result<()>;
    /// Serves requests for as long as the server lives. The server holds a
    /// sender of its own channel, so this never returns.
    async fn run(&mut self) {
        loop {
            if let Err(e) = self.handle().await {
                warn!("request dropped: {}", e);
            }
        }
    }
}
