use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use log::{debug, trace, warn};
use rand::{thread_rng, Rng};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::config::Config;
use crate::wire::{self, Builder, Message, QueryClass, QueryType, RRData};

/// Why a resolution chain stopped without an answer
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("upstream exchange timed out")]
    NetworkTimeout,
    #[error("upstream server unreachable: {0}")]
    NetworkUnreachable(#[source] io::Error),
    #[error("malformed upstream response: {0}")]
    Malformed(#[from] wire::Error),
    #[error("referral chain exceeded {0} hops")]
    TooManyHops(usize),
    #[error("no answer and no usable referral")]
    ResolutionFailed,
}

/// One send/receive UDP exchange against a single server
///
/// Each call acquires a fresh endpoint, uses it for exactly one request and
/// one reply bounded by a timeout, and releases it when the call returns.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, request: &[u8], server: SocketAddr)
        -> Result<Vec<u8>, ResolveError>;
}

pub struct UdpTransport {
    timeout: Duration,
    recv_size: usize,
}

impl UdpTransport {
    pub fn new(config: &Config) -> UdpTransport {
        UdpTransport {
            timeout: config.upstream_timeout,
            recv_size: config.recv_size,
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn exchange(
        &self,
        request: &[u8],
        server: SocketAddr,
    ) -> Result<Vec<u8>, ResolveError> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .await
            .map_err(ResolveError::NetworkUnreachable)?;
        socket
            .connect(server)
            .await
            .map_err(ResolveError::NetworkUnreachable)?;
        socket
            .send(request)
            .await
            .map_err(ResolveError::NetworkUnreachable)?;

        let mut buf = vec![0u8; self.recv_size];
        let received = timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| ResolveError::NetworkTimeout)?
            .map_err(ResolveError::NetworkUnreachable)?;
        buf.truncate(received);
        Ok(buf)
    }
}

/// Walks the delegation hierarchy from a root hint until a server answers
///
/// Holds no per-request state; a single hop budget is threaded through each
/// chain, nested nameserver lookups included, so referral loops terminate.
pub struct Resolver<T> {
    transport: T,
    root: SocketAddr,
    upstream_port: u16,
    max_hops: usize,
}

impl<T> Resolver<T> {
    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Resolver<T> {
    pub fn new(config: &Config, transport: T) -> Resolver<T> {
        Resolver {
            transport,
            root: config.root_server,
            upstream_port: config.upstream_port,
            max_hops: config.max_hops,
        }
    }

    /// Resolves an already-encoded question, starting at the root hint.
    pub async fn resolve(&self, request: &[u8]) -> Result<Message, ResolveError> {
        let mut hops = self.max_hops;
        self.walk(request, self.root, &mut hops).await
    }

    /// One delegation walk. Per hop: ask the target server; an answer ends
    /// the walk, otherwise the first authority record is followed, through
    /// its glue address when one is bundled or through a separate lookup of
    /// the nameserver's own address when not. First match wins; there is no
    /// retry against later authority records.
    async fn walk(
        &self,
        request: &[u8],
        mut server: SocketAddr,
        hops: &mut usize,
    ) -> Result<Message, ResolveError> {
        loop {
            if *hops == 0 {
                return Err(ResolveError::TooManyHops(self.max_hops));
            }
            *hops -= 1;

            trace!("querying {}", server);
            let raw = self.transport.exchange(request, server).await?;
            let response = Message::parse(&raw)?;

            if !response.answers.is_empty() {
                return Ok(response);
            }

            let authority = match response.nameservers.first() {
                Some(record) => record,
                None => return Err(ResolveError::ResolutionFailed),
            };
            let ns_name = match authority.data {
                RRData::NS(ref name) => name,
                ref other => {
                    warn!("authority record carries {:?} data, cannot follow", other);
                    return Err(ResolveError::ResolutionFailed);
                }
            };

            let glue = response.additional.iter().find_map(|record| {
                match (record.name == *ns_name, &record.data) {
                    (true, RRData::A(ip)) => Some(*ip),
                    _ => None,
                }
            });

            let next_ip = match glue {
                Some(ip) => {
                    debug!("referral to {} with glue {}", ns_name, ip);
                    ip
                }
                None => {
                    debug!("referral to {} without glue, resolving it", ns_name);
                    self.lookup_nameserver(ns_name, hops).await?
                }
            };
            server = SocketAddr::new(IpAddr::V4(next_ip), self.upstream_port);
        }
    }

    /// Issues a separate A query for a nameserver we were referred to
    /// without glue, starting over from the root hint.
    fn lookup_nameserver<'a>(
        &'a self,
        ns_name: &'a wire::Name,
        hops: &'a mut usize,
    ) -> BoxFuture<'a, Result<std::net::Ipv4Addr, ResolveError>> {
        Box::pin(async move {
            let request = Builder::new_request(thread_rng().gen())
                .add_question(ns_name, QueryType::A, QueryClass::IN)
                .build()
                .unwrap_or_else(|x| x);
            let response = self.walk(&request, self.root, hops).await?;
            response
                .answers
                .iter()
                .find_map(|record| match record.data {
                    RRData::A(ip) => Some(ip),
                    _ => None,
                })
                .ok_or(ResolveError::ResolutionFailed)
        })
    }
}
