use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rvoip_sip_core::message::SipMessage;
use rvoip_sip_core::types::header::{HeaderName, TypedHeader};
use rvoip_sip_core::types::uri::Uri;
use tokio::sync::{mpsc, Mutex};

use crate::context::TransportContext;
use crate::error::{Error, Result};
use crate::resolver::{Resolver, SystemResolver};
use crate::tcp::TcpTransport;
use crate::transport::{Transport, TransportKind};
use crate::udp::UdpTransport;

const DEFAULT_TCP_LINGER: Duration = Duration::from_secs(120);

/// The listener set plus outbound routing logic (spec.md §4.7
/// TransportSelector). Holds every bound listener, picks among them for
/// outbound sends per Route/Request-URI, rewrites Via/Contact to match
/// the chosen listener, and is the single point messages from every
/// listener funnel through on the way to the transaction layer.
pub struct TransportSelector {
    listeners: Mutex<Vec<Arc<dyn Transport>>>,
    aliases: Mutex<HashSet<String>>,
    resolver: Arc<dyn Resolver>,
    incoming_tx: mpsc::Sender<(SipMessage, TransportContext)>,
    incoming_rx: Mutex<mpsc::Receiver<(SipMessage, TransportContext)>>,
    tcp_linger: Duration,
    /// Forwarded to every listener's read loop as `SipMessage::parse_with`'s
    /// `permissive` flag (spec.md §4.3 / `StackConfig::permissive_parse`).
    /// Shared rather than copied so a caller that flips it after some
    /// transports are already bound still reaches their running reader
    /// tasks.
    permissive: Arc<AtomicBool>,
}

impl TransportSelector {
    pub fn new() -> Arc<Self> {
        Self::with_resolver(Arc::new(SystemResolver))
    }

    pub fn with_resolver(resolver: Arc<dyn Resolver>) -> Arc<Self> {
        Self::with_resolver_and_linger(resolver, DEFAULT_TCP_LINGER)
    }

    /// As [`Self::with_resolver`], but overriding the idle-eviction
    /// window new TCP listeners bind with (spec.md §4.7 "idle
    /// eviction"), e.g. from a caller's `StackConfig::tcp_linger`.
    pub fn with_resolver_and_linger(resolver: Arc<dyn Resolver>, tcp_linger: Duration) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(256);
        Arc::new(TransportSelector {
            listeners: Mutex::new(Vec::new()),
            aliases: Mutex::new(HashSet::new()),
            resolver,
            incoming_tx: tx,
            incoming_rx: Mutex::new(rx),
            tcp_linger,
            permissive: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Set whether a short body against a declared `Content-Length` is
    /// delivered anyway instead of discarded (spec.md §4.3
    /// `StackConfig::permissive_parse`). Takes effect immediately, even
    /// for listeners already bound.
    pub fn set_permissive_parse(&self, permissive: bool) {
        self.permissive.store(permissive, Ordering::Relaxed);
    }

    /// Bind a listener of `kind` on `addr`. Idempotent by `(kind, addr)`
    /// (spec.md §6 `stack.addTransport`): binding the same kind/address
    /// twice returns the already-bound listener instead of erroring or
    /// rebinding.
    pub async fn add_transport(&self, kind: TransportKind, addr: SocketAddr) -> Result<Arc<dyn Transport>> {
        {
            let listeners = self.listeners.lock().await;
            if let Some(existing) = listeners.iter().find(|l| l.kind() == kind && l.local_addr() == addr) {
                return Ok(existing.clone());
            }
        }
        let transport: Arc<dyn Transport> = match kind {
            TransportKind::Udp => UdpTransport::bind(addr, self.incoming_tx.clone(), self.permissive.clone()).await?,
            // TCP framing (`tcp.rs::try_extract_message`) only ever hands
            // `SipMessage::parse` exactly header-block-plus-declared-length
            // bytes, so a short body can't occur here the way it can for a
            // truncated UDP datagram — `permissive` has nothing to do.
            TransportKind::Tcp => TcpTransport::bind(addr, self.incoming_tx.clone(), self.tcp_linger).await?,
        };
        self.listeners.lock().await.push(transport.clone());
        Ok(transport)
    }

    /// Register a domain this stack answers for (spec.md §6
    /// `stack.addAlias`). Compared case-insensitively by
    /// [`Self::is_my_domain`].
    pub async fn add_alias(&self, domain: impl Into<String>) {
        self.aliases.lock().await.insert(domain.into().to_ascii_lowercase());
    }

    pub async fn is_my_domain(&self, domain: &str) -> bool {
        let needle = domain.to_ascii_lowercase();
        if self.aliases.lock().await.contains(&needle) {
            return true;
        }
        self.listeners.lock().await.iter().any(|l| l.local_addr().ip().to_string().eq_ignore_ascii_case(domain))
    }

    /// Pop the next inbound message pushed by any listener's read loop,
    /// already tagged with its arrival [`TransportContext`] (spec.md §4.7
    /// "Inbound: the selector tags each parsed message with its arrival
    /// transport context and pushes into the incoming FIFO").
    pub async fn receive(&self) -> Option<(SipMessage, TransportContext)> {
        self.incoming_rx.lock().await.recv().await
    }

    /// Find the listener a message arrived on, so a reply can go back out
    /// the same socket it came in on (UDP needs this for NAT-friendly
    /// symmetric response routing; TCP needs it to reuse the inbound
    /// connection rather than dialing a new one).
    pub async fn transport_for_context(&self, ctx: &TransportContext) -> Option<Arc<dyn Transport>> {
        self.listeners
            .lock()
            .await
            .iter()
            .find(|l| l.kind() == ctx.kind && l.local_addr() == ctx.received_interface)
            .cloned()
    }

    /// Choose a listener and destination address for an outbound
    /// message: a top Route wins over the Request-URI (spec.md §4.7 "if
    /// Route is set, inspect topmost route URI's transport and host to
    /// pick a listener by same address family; else resolve
    /// Request-URI via the resolver").
    pub async fn select_for(&self, msg: &SipMessage) -> Result<(Arc<dyn Transport>, SocketAddr)> {
        let target_uri = self.routing_uri(msg)?;
        self.select_for_uri(&target_uri).await
    }

    /// The URI send logic should route toward: the topmost `Route`
    /// header if one is present, else the Request-URI.
    fn routing_uri(&self, msg: &SipMessage) -> Result<Uri> {
        if let Some(route) = msg.header(&HeaderName::Route) {
            let mut route = route.clone();
            if let TypedHeader::Route(na) = route.typed().map_err(rvoip_sip_core::error::Error::Parse)? {
                return Ok(na.uri.clone());
            }
        }
        let rl = msg.request_line().ok_or(Error::NoRoute)?;
        Ok(rl.uri.clone())
    }

    async fn select_for_uri(&self, uri: &Uri) -> Result<(Arc<dyn Transport>, SocketAddr)> {
        let requested_kind = match uri.transport() {
            Some(t) if t.eq_ignore_ascii_case("tcp") => Some(TransportKind::Tcp),
            Some(t) if t.eq_ignore_ascii_case("udp") => Some(TransportKind::Udp),
            _ => None,
        };

        let candidates = self.resolver.resolve(&uri.host, uri.effective_port()).await?;
        let dest = *candidates.first().ok_or(Error::NoRoute)?;

        let listeners = self.listeners.lock().await;
        let chosen = listeners
            .iter()
            .find(|l| requested_kind.map(|k| l.kind() == k).unwrap_or(true) && l.local_addr().is_ipv4() == dest.is_ipv4())
            .or_else(|| listeners.first())
            .cloned()
            .ok_or(Error::NoRoute)?;
        Ok((chosen, dest))
    }

    /// Rewrite the top Via's sent-by and the Contact URI's host/port to
    /// match `chosen`, unless `preserve` is set (spec.md §4.7: "unless
    /// the TU explicitly set them and a 'preserve' flag is on").
    pub fn rewrite_via_and_contact(msg: &mut SipMessage, chosen: &Arc<dyn Transport>, preserve: bool) -> Result<()> {
        if preserve {
            return Ok(());
        }
        let local = chosen.local_addr();
        if let Some(field) = msg.header_mut(&HeaderName::Via) {
            if let TypedHeader::Via(via) = field.typed().map_err(rvoip_sip_core::error::Error::Parse)?.clone() {
                let mut via = via;
                via.sent_host = local.ip().to_string();
                via.sent_host_is_ipv6_literal = local.is_ipv6();
                via.sent_port = Some(local.port());
                via.transport = chosen.kind().as_via_str().to_string();
                field.set_typed(TypedHeader::Via(via));
            }
        }
        if let Some(field) = msg.header_mut(&HeaderName::Contact) {
            if let TypedHeader::Contact(na) = field.typed().map_err(rvoip_sip_core::error::Error::Parse)?.clone() {
                let mut na = na;
                na.uri.host = local.ip().to_string();
                na.uri.host_is_ipv6_literal = local.is_ipv6();
                na.uri.port = Some(local.port());
                field.set_typed(TypedHeader::Contact(na));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TransportSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSelector").finish_non_exhaustive()
    }
}
