use std::net::SocketAddr;

use crate::transport::TransportKind;

/// Per-message transport context, attached by the selector to every
/// message it hands upward (spec.md §3 SipMessage `transportContext`).
///
/// `tls_peer_identity` is always `None` in this build — real TLS peer
/// certificates are out of this crate's scope (spec.md §1 Non-goals:
/// "S/MIME, DTLS ... concrete DNS resolution wire details"); the field
/// exists so a caller that layers TLS identity verification on top has
/// somewhere to put it without changing this struct's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportContext {
    pub received_interface: SocketAddr,
    pub peer_address: SocketAddr,
    pub kind: TransportKind,
    pub tls_peer_identity: Option<()>,
}

impl TransportContext {
    pub fn new(received_interface: SocketAddr, peer_address: SocketAddr, kind: TransportKind) -> Self {
        TransportContext { received_interface, peer_address, kind, tls_peer_identity: None }
    }
}
