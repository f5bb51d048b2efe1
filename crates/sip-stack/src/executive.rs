use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rvoip_sip_core::message::SipMessage;
use rvoip_sip_dialog::registry::DialogRegistry;
use rvoip_sip_transaction::event::TransactionEvent;
use rvoip_sip_transaction::key::TransactionKey;
use rvoip_sip_transaction::manager::TransactionManager;
use rvoip_sip_transport::resolver::{Resolver, SystemResolver};
use rvoip_sip_transport::selector::TransportSelector;
use rvoip_sip_transport::transport::{Transport, TransportKind};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::StackConfig;
use crate::error::Result;

/// Owns every piece of mutable state spec.md §5 assigns to the
/// cooperative scheduler: the transaction map and timer queue (both
/// inside [`TransactionManager`]) and the dialog registry. Exactly one
/// `&mut Executive` ever touches any of it — the same single-owner
/// discipline [`TransactionManager`] already keeps on its own — so
/// nothing here needs a lock.
///
/// `buildFdSet`/`process`/`getTimeTillNextProcess` from spec.md §6
/// collapse into [`Self::run_once`]'s `tokio::select!` over the
/// transport's incoming FIFO and the next timer deadline: the idiomatic
/// tokio shape for "the loop suspends in exactly one place per
/// iteration" (spec.md §5 "Suspension points").
pub struct Executive {
    manager: TransactionManager,
    tu_rx: mpsc::Receiver<TransactionEvent>,
    dialogs: DialogRegistry,
    transport: Arc<TransportSelector>,
    config: StackConfig,
}

impl Executive {
    pub fn new(transport: Arc<TransportSelector>, config: StackConfig) -> Self {
        let (mut manager, tu_rx) = TransactionManager::new(transport.clone(), config.timers);
        manager.set_stray_response_policy(config.stray_response_policy);
        transport.set_permissive_parse(config.permissive_parse);
        Executive { manager, tu_rx, dialogs: DialogRegistry::new(), transport, config }
    }

    /// Build the system-resolved [`TransportSelector`] `config.tcp_linger`
    /// calls for and wrap it in a fresh [`Executive`], for the common case
    /// of a caller with no custom [`Resolver`]. A caller that needs one
    /// (e.g. a test double, or real RFC 3263 SRV/NAPTR resolution) should
    /// build its own `TransportSelector::with_resolver_and_linger` and go
    /// through [`Self::new`] instead — that is the only path that keeps
    /// `tcp_linger` meaningful, since it is baked into each TCP listener's
    /// idle-eviction task at bind time rather than read live.
    pub fn with_config(config: StackConfig) -> Self {
        let transport = TransportSelector::with_resolver_and_linger(Arc::new(SystemResolver) as Arc<dyn Resolver>, config.tcp_linger);
        Self::new(transport, config)
    }

    /// `stack.addTransport(kind, port, host?, nic?)` (spec.md §6):
    /// idempotent by `(kind, addr)`.
    pub async fn add_transport(&self, kind: TransportKind, addr: SocketAddr) -> rvoip_sip_transport::error::Result<Arc<dyn Transport>> {
        self.transport.add_transport(kind, addr).await
    }

    /// `stack.addAlias(domain)`.
    pub async fn add_alias(&self, domain: impl Into<String>) {
        self.transport.add_alias(domain).await
    }

    /// `stack.isMyDomain(domain)`.
    pub async fn is_my_domain(&self, domain: &str) -> bool {
        self.transport.is_my_domain(domain).await
    }

    /// `stack.send(message)` for a fresh outbound request: creates its
    /// client transaction, which the manager immediately hands its first
    /// `Send` effect to the chosen transport.
    pub async fn send_request(&mut self, request: SipMessage) -> Result<TransactionKey> {
        Ok(self.manager.send_request(request).await?)
    }

    /// `stack.send(message)` for the TU's response to an existing server
    /// transaction.
    pub async fn send_response(&mut self, key: &TransactionKey, response: SipMessage) -> Result<()> {
        Ok(self.manager.send_response(key, response).await?)
    }

    /// `stack.receive()`: non-blocking pop of the next TU-bound event.
    /// Returns `None` if nothing is queued right now — callers that want
    /// to block until one arrives should use [`Self::receive`] instead.
    pub fn try_receive(&mut self) -> Option<TransactionEvent> {
        self.tu_rx.try_recv().ok()
    }

    /// Wait for the next TU-bound event, pumping the cooperative loop
    /// one iteration at a time until one is produced. This is the usual
    /// way a TU drives the stack: call this in a loop, react to what
    /// comes back, call [`Self::send_request`]/[`Self::send_response`]
    /// as needed, and call again.
    pub async fn receive(&mut self) -> Option<TransactionEvent> {
        loop {
            if let Ok(event) = self.tu_rx.try_recv() {
                return Some(event);
            }
            if !self.run_once().await {
                return None;
            }
        }
    }

    pub fn dialogs(&self) -> &DialogRegistry {
        &self.dialogs
    }

    pub fn dialogs_mut(&mut self) -> &mut DialogRegistry {
        &mut self.dialogs
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// `stack.getTimeTillNextProcess()`: how long a caller driving its
    /// own loop (rather than [`Self::run`]/[`Self::receive`]) may sleep
    /// before a timer needs servicing.
    pub fn time_till_next_process(&mut self) -> Option<Duration> {
        self.manager.next_timer_due().map(|due| due.checked_duration_since(Instant::now()).unwrap_or_default())
    }

    /// `stack.process(fds)`: drive every timer that has already come
    /// due. Paired with [`Self::time_till_next_process`] for a caller
    /// that wants to own its own `select`/poll loop instead of
    /// [`Self::run`].
    pub async fn process_timers(&mut self) {
        self.manager.poll_timers().await;
    }

    /// One iteration of the cooperative loop (spec.md §4.8 "event loop:
    /// socket readiness → transport → transaction → TU; timer expiry →
    /// transaction"). Returns `false` once the transport's incoming FIFO
    /// has closed (every listener dropped), meaning there is nothing
    /// left to pump.
    async fn run_once(&mut self) -> bool {
        let deadline = self.manager.next_timer_due();
        tokio::select! {
            biased;
            incoming = self.transport.receive() => {
                match incoming {
                    Some((message, ctx)) => {
                        if let Err(err) = self.manager.handle_incoming(message, ctx).await {
                            warn!(%err, "dropping inbound message the transaction layer rejected");
                        }
                        true
                    }
                    None => false,
                }
            }
            _ = sleep_until_or_pending(deadline) => {
                self.manager.poll_timers().await;
                true
            }
        }
    }

    /// Run the cooperative loop until the transport layer shuts down.
    /// Use this when the TU reacts to events purely through
    /// [`Self::try_receive`] polled from elsewhere; [`Self::receive`] is
    /// the usual entry point otherwise.
    pub async fn run(&mut self) {
        while self.run_once().await {}
        debug!("executive run loop exiting, transport shut down");
    }
}

async fn sleep_until_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(instant) => tokio::time::sleep_until(instant).await,
        None => std::future::pending::<()>().await,
    }
}
