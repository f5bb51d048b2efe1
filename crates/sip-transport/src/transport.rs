use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::Result;

/// The transport kinds this crate knows how to bind and select among
/// (spec.md §4.7/§3: "Variants: UDP (connectionless, one socket), TCP
/// (listener + per-peer connection map with idle eviction)"). TLS is
/// named in spec.md as a possible third variant but is explicitly out of
/// this core's scope (see crate-level docs); it is not modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Udp,
    Tcp,
}

impl TransportKind {
    pub fn is_reliable(self) -> bool {
        matches!(self, TransportKind::Tcp)
    }

    pub fn as_via_str(self) -> &'static str {
        match self {
            TransportKind::Udp => "UDP",
            TransportKind::Tcp => "TCP",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_via_str())
    }
}

/// A bound listener/socket set capable of sending to a peer address
/// (spec.md §3 Transport: "polymorphic over {bind, send(to-addr, bytes),
/// receive()}"). `receive()` is not part of this trait: each
/// implementation pushes inbound messages into the selector's shared
/// queue from its own background task instead of being polled, which is
/// the shape spec.md §9 "Scheduler shape" recommends (transport readers
/// may be spawned tasks; only the central FIFO is shared state).
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    fn kind(&self) -> TransportKind;

    fn local_addr(&self) -> SocketAddr;

    async fn send(&self, dest: SocketAddr, bytes: &[u8]) -> Result<()>;

    fn is_reliable(&self) -> bool {
        self.kind().is_reliable()
    }
}
