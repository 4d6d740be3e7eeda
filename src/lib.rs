//! A small recursive DNS resolver.
//!
//! Client queries arrive over UDP; for each question the server walks the
//! delegation hierarchy from a root hint (root, TLD, authoritative servers)
//! until some server answers, caching the results by name and type. Only
//! A, NS, PTR and AAAA records are spoken, over single-datagram UDP.

pub mod cache;
pub mod config;
pub mod resolver;
pub mod server;
pub mod wire;

pub use crate::cache::{Cache, SharedCache};
pub use crate::config::Config;
pub use crate::resolver::{ResolveError, Resolver, Transport, UdpTransport};
pub use crate::server::Server;
