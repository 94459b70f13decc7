use std::{path::PathBuf, time::Duration};

use structopt::StructOpt;

use replikv::{
    server::{self, NodeOptions},
    ClusterConfig, Mode, ReplicationConfig,
};

#[derive(StructOpt, Debug)]
#[structopt(name = "replikv-node", version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Address to listen on
    #[structopt(short, long, default_value = "127.0.0.1")]
    address: String,

    /// Port to listen on
    #[structopt(short, long)]
    port: u16,

    /// Id of this node in the cluster config
    #[structopt(short, long)]
    node_id: u32,

    /// Consistency mode: eventual, sequential or linearizable
    #[structopt(short, long, default_value = "eventual")]
    mode: Mode,

    /// Log every operation
    #[structopt(short, long)]
    verbose: bool,

    /// JSON array of {address, port, node_id}; three local nodes if omitted
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Timeout in milliseconds of a single call to a peer
    #[structopt(short, long, default_value = "2000")]
    timeout_ms: u64,

    /// Linearizable only: trust acknowledgements instead of reading deliveries back
    #[structopt(long)]
    no_read_back: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let cluster = match opt.config {
        Some(ref path) => ClusterConfig::load(path)?,
        None => ClusterConfig::local(),
    };
    let replication = ReplicationConfig {
        verify_reads: !opt.no_read_back,
        ..ReplicationConfig::default()
    };
    let opts = NodeOptions {
        address: opt.address,
        port: opt.port,
        node_id: opt.node_id,
        mode: opt.mode,
        verbose: opt.verbose,
        timeout: Duration::from_millis(opt.timeout_ms),
    };
    server::launch(opts, cluster, replication).await?;
    Ok(())
}
