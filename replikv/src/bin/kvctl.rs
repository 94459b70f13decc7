use std::{net::SocketAddr, time::Duration};

use labrpc::{client::Client, tcp};
use structopt::StructOpt;

use replikv::KvClient;

#[derive(StructOpt, Debug)]
#[structopt(name = "kvctl", version = env!("CARGO_PKG_VERSION"), about = "Talk to one replikv node")]
struct Opt {
    /// Node to talk to
    #[structopt(short, long, default_value = "127.0.0.1:34566")]
    server: SocketAddr,

    /// Timeout in milliseconds of the call
    #[structopt(short, long, default_value = "2000")]
    timeout_ms: u64,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Store a value
    Put { key: String, value: String },
    /// Read a value, NULL if absent
    Get { key: String },
    /// Delete a value, printing what it held
    Remove { key: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let node = KvClient::from_server(opt.server.to_string(), tcp::connect(opt.server))
        .with_timeout(Duration::from_millis(opt.timeout_ms));
    match opt.cmd {
        Command::Put { key, value } => node.put(key, value).await?,
        Command::Get { key } => println!("{}", node.get(key).await?),
        Command::Remove { key } => println!("{}", node.remove(key).await?),
    }
    Ok(())
}
