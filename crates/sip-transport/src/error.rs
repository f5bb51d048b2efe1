use std::net::SocketAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Transport-layer failures (spec.md §7 `TransportError`). These are
/// reported to the owning transaction, never propagated as panics — a
/// peer that resets a connection or a send that fails is routine, not
/// exceptional.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no listener bound for {0:?}")]
    NoListener(crate::transport::TransportKind),

    #[error("i/o error sending to {dest}: {source}")]
    Send { dest: SocketAddr, #[source] source: std::io::Error },

    #[error("i/o error binding {kind:?} listener on {addr}: {source}")]
    Bind { kind: crate::transport::TransportKind, addr: SocketAddr, #[source] source: std::io::Error },

    #[error("connection to {0} was reset")]
    ConnectionReset(SocketAddr),

    #[error("no candidate transport for request-URI/route")]
    NoRoute,

    #[error("incoming queue is full")]
    QueueFull,

    #[error(transparent)]
    Message(#[from] rvoip_sip_core::error::Error),
}
