use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rvoip_sip_core::message::SipMessage;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use crate::context::TransportContext;
use crate::error::{Error, Result};
use crate::transport::{Transport, TransportKind};

struct Connection {
    writer: mpsc::Sender<Vec<u8>>,
    last_used: Instant,
}

/// A TCP listener plus a per-peer connection map with idle eviction
/// (spec.md §3/§4.7: "TCP (listener + per-peer connection map with idle
/// eviction)"). Connections are reused for outbound sends keyed by peer
/// address; a connection unused for longer than `linger` is dropped by
/// the eviction sweep.
#[derive(Debug)]
pub struct TcpTransport {
    local_addr: SocketAddr,
    connections: Mutex<HashMap<SocketAddr, Connection>>,
    incoming: mpsc::Sender<(SipMessage, TransportContext)>,
    linger: Duration,
}

impl TcpTransport {
    pub async fn bind(
        addr: SocketAddr,
        incoming: mpsc::Sender<(SipMessage, TransportContext)>,
        linger: Duration,
    ) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { kind: TransportKind::Tcp, addr, source })?;
        let local_addr = listener.local_addr().map_err(|source| Error::Bind { kind: TransportKind::Tcp, addr, source })?;

        let this = Arc::new(TcpTransport {
            local_addr,
            connections: Mutex::new(HashMap::new()),
            incoming: incoming.clone(),
            linger,
        });

        let accept_incoming = incoming.clone();
        tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "tcp accept failed, listener task exiting");
                        return;
                    }
                };
                spawn_peer_reader(stream, peer, local_addr, accept_incoming.clone());
            }
        });

        let sweeper = this.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweeper.linger.max(Duration::from_millis(100)));
            loop {
                interval.tick().await;
                sweeper.evict_idle().await;
            }
        });

        Ok(this)
    }

    async fn evict_idle(&self) {
        let now = Instant::now();
        let linger = self.linger;
        let mut conns = self.connections.lock().await;
        conns.retain(|peer, conn| {
            let keep = now.duration_since(conn.last_used) < linger;
            if !keep {
                tracing::debug!(%peer, "evicting idle TCP connection");
            }
            keep
        });
    }

    /// Obtain (reusing if present) the write half for `dest`, dialing a
    /// fresh connection and spawning its reader if none exists yet.
    async fn connection_for(&self, dest: SocketAddr) -> Result<mpsc::Sender<Vec<u8>>> {
        let mut conns = self.connections.lock().await;
        if let Some(conn) = conns.get_mut(&dest) {
            conn.last_used = Instant::now();
            return Ok(conn.writer.clone());
        }
        drop(conns);

        let stream = TcpStream::connect(dest).await.map_err(|source| Error::Send { dest, source })?;
        let local = self.local_addr;
        let incoming = self.incoming.clone();
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel::<Vec<u8>>(64);
        spawn_writer(write_half, rx);
        spawn_reader_loop(read_half, dest, local, incoming);

        let mut conns = self.connections.lock().await;
        conns.insert(dest, Connection { writer: tx.clone(), last_used: Instant::now() });
        Ok(tx)
    }
}

fn spawn_writer(mut half: tokio::net::tcp::OwnedWriteHalf, mut rx: mpsc::Receiver<Vec<u8>>) {
    tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            if let Err(e) = half.write_all(&bytes).await {
                tracing::warn!(error = %e, "tcp write failed, connection writer exiting");
                return;
            }
        }
    });
}

fn spawn_peer_reader(
    stream: TcpStream,
    peer: SocketAddr,
    local: SocketAddr,
    incoming: mpsc::Sender<(SipMessage, TransportContext)>,
) {
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::channel::<Vec<u8>>(64);
    spawn_writer(write_half, rx);
    // Inbound-initiated connections do not register in `connections` —
    // this core does not send unsolicited requests back down a
    // connection a peer opened to us unless that peer later appears as
    // an outbound destination, matching how a UAS commonly behaves.
    let _ = tx;
    spawn_reader_loop(read_half, peer, local, incoming);
}

/// RFC 3261 is framed by `Content-Length` over TCP (spec.md §6): the
/// reader accumulates bytes until it has a full header block and then
/// exactly `Content-Length` body bytes, repeating for however many
/// messages arrive back-to-back on the stream.
fn spawn_reader_loop(
    mut half: tokio::net::tcp::OwnedReadHalf,
    peer: SocketAddr,
    local: SocketAddr,
    incoming: mpsc::Sender<(SipMessage, TransportContext)>,
) {
    tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match try_extract_message(&buf) {
                Some((consumed, result)) => {
                    buf.drain(..consumed);
                    match result {
                        Ok(mut msg) => {
                            msg.received_from = Some(peer);
                            let ctx = TransportContext::new(local, peer, TransportKind::Tcp);
                            if incoming.send((msg, ctx)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => tracing::warn!(%peer, error = %e, "discarding unparseable TCP message"),
                    }
                    continue;
                }
                None => {}
            }
            let n = match half.read(&mut chunk).await {
                Ok(0) => {
                    tracing::debug!(%peer, "TCP peer closed connection");
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(%peer, error = %e, "tcp read failed, reader exiting");
                    return;
                }
            };
            buf.extend_from_slice(&chunk[..n]);
        }
    });
}

/// Looks for a complete header block plus its declared Content-Length
/// worth of body inside `buf`. Returns `(bytes_consumed, parse_result)`
/// once a full message is available, or `None` if more bytes are needed.
fn try_extract_message(buf: &[u8]) -> Option<(usize, rvoip_sip_core::error::Result<SipMessage>)> {
    let header_end = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)?;
    let content_length = parse_content_length(&buf[..header_end]).unwrap_or(0);
    let total = header_end + content_length;
    if buf.len() < total {
        return None;
    }
    Some((total, SipMessage::parse(&buf[..total])))
}

fn parse_content_length(header_block: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(header_block);
    for line in text.split("\r\n") {
        let mut parts = line.splitn(2, ':');
        let name = parts.next()?.trim();
        if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("l") {
            return parts.next()?.trim().parse::<usize>().ok();
        }
    }
    None
}

#[async_trait]
impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn send(&self, dest: SocketAddr, bytes: &[u8]) -> Result<()> {
        let writer = self.connection_for(dest).await?;
        writer.send(bytes.to_vec()).await.map_err(|_| Error::ConnectionReset(dest))
    }
}
