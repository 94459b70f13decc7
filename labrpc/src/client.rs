use std::time::Duration;

use tokio::sync::mpsc::Sender;

use crate::network::NetworkPackage;

/// Upper bound of a single call when the caller did not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

pub trait Client {
    fn from_server(server_id: String, net_tx: Sender<NetworkPackage>) -> Self;
}
