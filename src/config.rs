use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings, built once at startup and passed by reference into the
/// server, resolver and transport constructors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the server listens on for client queries.
    pub bind: SocketAddr,
    /// Root hint: the server every resolution chain starts from.
    pub root_server: SocketAddr,
    /// Port used for servers discovered during delegation.
    pub upstream_port: u16,
    /// Receive buffer size for client requests and upstream replies.
    pub recv_size: usize,
    /// How long one upstream exchange may take before it fails.
    pub upstream_timeout: Duration,
    /// Total exchanges a single resolution chain may spend, nested
    /// nameserver lookups included.
    pub max_hops: usize,
    /// Cache snapshot location; `None` disables persistence.
    pub cache_path: Option<PathBuf>,
    /// How often expired cache entries are swept out.
    pub cache_sweep_period: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            bind: "127.0.0.1:5300".parse().unwrap(),
            // a.root-servers.net
            root_server: "198.41.0.4:53".parse().unwrap(),
            upstream_port: 53,
            recv_size: 512,
            upstream_timeout: Duration::from_secs(5),
            max_hops: 16,
            cache_path: None,
            cache_sweep_period: Duration::from_secs(60),
        }
    }
}
