use std::io;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use log::{debug, info, trace, warn};
use tokio::net::UdpSocket;

use crate::cache::{Cache, SharedCache};
use crate::config::Config;
use crate::resolver::{Resolver, Transport, UdpTransport};
use crate::wire::{unsupported_response, Builder, Message, Question};

/// The UDP accept loop: decodes client queries, serves them from the cache
/// or drives the resolver, and replies.
pub struct Server {
    socket: Arc<UdpSocket>,
    cache: SharedCache,
    resolver: Arc<Resolver<UdpTransport>>,
    config: Config,
}

impl Server {
    pub async fn bind(config: Config) -> io::Result<Server> {
        let socket = UdpSocket::bind(config.bind).await?;
        info!("listening on {}", config.bind);

        let cache = Arc::new(Cache::new());
        if let Some(ref path) = config.cache_path {
            if let Err(err) = cache.load(path) {
                warn!("could not load cache from {}: {}", path.display(), err);
            }
        }
        Cache::start_sweeper(&cache, config.cache_sweep_period);

        let resolver = Arc::new(Resolver::new(&config, UdpTransport::new(&config)));

        Ok(Server {
            socket: Arc::new(socket),
            cache,
            resolver,
            config,
        })
    }

    /// Serves until ctrl-c, then snapshots the cache and returns.
    pub async fn run(&self) -> io::Result<()> {
        let mut buf = vec![0u8; self.config.recv_size];
        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = received?;
                    trace!("received {} bytes from {}", len, peer);
                    let request = buf[..len].to_vec();
                    let socket = self.socket.clone();
                    let cache = self.cache.clone();
                    let resolver = self.resolver.clone();
                    tokio::spawn(async move {
                        let reply = process_request(&request, &cache, &*resolver).await;
                        if let Err(err) = socket.send_to(&reply, peer).await {
                            warn!("could not reply to {}: {}", peer, err);
                        }
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                    if let Some(ref path) = self.config.cache_path {
                        if let Err(err) = self.cache.save(path) {
                            warn!("could not save cache to {}: {}", path.display(), err);
                        }
                    }
                    return Ok(());
                }
            }
        }
    }
}

/// Produces the reply for one client datagram. Every failure mode answers
/// with the unsupported template; clients are never left without a reply,
/// and nothing here can take the accept loop down.
async fn process_request<T: Transport>(
    request: &[u8],
    cache: &Cache,
    resolver: &Resolver<T>,
) -> Vec<u8> {
    let message = match Message::parse(request) {
        Ok(message) => message,
        Err(err) => {
            warn!("dropping malformed request: {}", err);
            return unsupported_response(salvage_id(request));
        }
    };

    let mut records = Vec::new();
    for question in &message.questions {
        let name = question.qname.to_string();
        if let Some(cached) = cache.get(&name, question.qtype) {
            debug!("cache hit for {} {:?}", name, question.qtype);
            records.extend(cached);
            continue;
        }

        let query = encode_question(message.header.id, question);
        match resolver.resolve(&query).await {
            Ok(response) => {
                cache.put(&name, question.qtype, response.answers.clone());
                records.extend(response.answers);
            }
            Err(err) => {
                warn!("resolution of {} {:?} failed: {}", name, question.qtype, err);
                return unsupported_response(message.header.id);
            }
        }
    }

    let mut builder = Builder::new_response(message.header.id);
    for question in &message.questions {
        builder = builder.add_question(&question.qname, question.qtype, question.qclass);
    }
    let mut builder = builder.move_to::<crate::wire::Answers>();
    for record in &records {
        builder = builder.add_answer(&record.name, record.cls, record.ttl, &record.data);
    }
    builder.build().unwrap_or_else(|x| x)
}

fn encode_question(id: u16, question: &Question) -> Vec<u8> {
    Builder::new_request(id)
        .add_question(&question.qname, question.qtype, question.qclass)
        .build()
        .unwrap_or_else(|x| x)
}

/// Pulls the transaction id out of a buffer too broken to parse, so even a
/// malformed request gets an error reply under its own id.
fn salvage_id(request: &[u8]) -> u16 {
    if request.len() >= 2 {
        BigEndian::read_u16(&request[..2])
    } else {
        0
    }
}
