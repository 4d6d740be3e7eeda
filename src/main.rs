use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::error;

use rdns::{Config, Server};

#[derive(Parser, Debug)]
#[command(version, about = "Small recursive DNS resolver over UDP")]
struct Args {
    /// Address to listen on for client queries
    #[arg(long, default_value = "127.0.0.1:5300")]
    bind: SocketAddr,

    /// Root server every resolution chain starts from
    #[arg(long, default_value = "198.41.0.4:53")]
    root_server: SocketAddr,

    /// Per-exchange upstream timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Maximum upstream exchanges per resolution chain
    #[arg(long, default_value_t = 16)]
    max_hops: usize,

    /// File the cache is loaded from on startup and saved to on shutdown
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Seconds between sweeps of expired cache entries
    #[arg(long, default_value_t = 60)]
    cache_sweep: u64,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            bind: self.bind,
            root_server: self.root_server,
            upstream_timeout: Duration::from_secs(self.timeout),
            max_hops: self.max_hops,
            cache_path: self.cache_file,
            cache_sweep_period: Duration::from_secs(self.cache_sweep),
            ..Config::default()
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let config = Args::parse().into_config();

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(err) => {
            error!("could not start server: {}", err);
            std::process::exit(1);
        }
    };
    if let Err(err) = server.run().await {
        error!("server loop failed: {}", err);
        std::process::exit(1);
    }
}
