use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rvoip_sip_core::message::SipMessage;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::context::TransportContext;
use crate::error::{Error, Result};
use crate::transport::{Transport, TransportKind};

/// A UDP listener: one socket, connectionless (spec.md §3 Transport
/// variants). Inbound datagrams are read by a background task and
/// pushed into the shared incoming queue as parsed [`SipMessage`]s;
/// malformed datagrams are logged and dropped (spec.md §7 ParseError:
/// "Never fatal to the stack").
#[derive(Debug)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind a UDP socket and spawn its read loop, forwarding parsed
    /// messages (with transport context attached) into `incoming`.
    pub async fn bind(
        addr: SocketAddr,
        incoming: mpsc::Sender<(SipMessage, TransportContext)>,
        permissive: Arc<AtomicBool>,
    ) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Bind { kind: TransportKind::Udp, addr, source })?;
        let local_addr = socket.local_addr().map_err(|source| Error::Bind { kind: TransportKind::Udp, addr, source })?;
        let socket = Arc::new(socket);

        let reader = socket.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 65_535];
            loop {
                let (n, peer) = match reader.recv_from(&mut buf).await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "udp recv_from failed, read loop exiting");
                        return;
                    }
                };
                match SipMessage::parse_with(&buf[..n], permissive.load(Ordering::Relaxed)) {
                    Ok(mut msg) => {
                        msg.received_from = Some(peer);
                        let ctx = TransportContext::new(local_addr, peer, TransportKind::Udp);
                        if incoming.send((msg, ctx)).await.is_err() {
                            tracing::debug!("incoming queue closed, udp read loop exiting");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(peer = %peer, error = %e, "discarding unparseable UDP datagram");
                    }
                }
            }
        });

        Ok(Arc::new(UdpTransport { socket, local_addr }))
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Udp
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn send(&self, dest: SocketAddr, bytes: &[u8]) -> Result<()> {
        self.socket.send_to(bytes, dest).await.map_err(|source| Error::Send { dest, source })?;
        Ok(())
    }
}
