use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use rand::RngCore;
use rvoip_sip_core::message::{SipMessage, StartLine};
use rvoip_sip_core::types::header::{HeaderName, TypedHeader};
use rvoip_sip_core::types::method::Method;
use rvoip_sip_transport::context::TransportContext;
use rvoip_sip_transport::selector::TransportSelector;
use rvoip_sip_transport::transport::Transport;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{ClientInviteTransaction, ClientNonInviteTransaction};
use crate::config::{StrayResponsePolicy, TimerSettings};
use crate::effect::Effect;
use crate::error::{Error, Result};
use crate::event::TransactionEvent;
use crate::key::TransactionKey;
use crate::server::{ServerInviteTransaction, ServerNonInviteTransaction};
use crate::timer::{TimerKind, TimerQueue, TimerToken};

/// Which of the four RFC 3261 §17 machines owns a given [`TransactionKey`]
/// (spec.md §4.4: "Four machines, each keyed by `{branch, sent-by,
/// method}`"). Boxed behind one enum rather than four maps so the
/// manager has a single lookup path regardless of role.
enum Slot {
    ClientInvite(ClientInviteTransaction),
    ClientNonInvite(ClientNonInviteTransaction),
    ServerInvite(ServerInviteTransaction),
    ServerNonInvite(ServerNonInviteTransaction),
}

impl Slot {
    fn is_terminated(&self) -> bool {
        match self {
            Slot::ClientInvite(t) => t.is_terminated(),
            Slot::ClientNonInvite(t) => t.is_terminated(),
            Slot::ServerInvite(t) => t.is_terminated(),
            Slot::ServerNonInvite(t) => t.is_terminated(),
        }
    }

    fn on_timer(&mut self, kind: TimerKind) -> Vec<Effect> {
        match self {
            Slot::ClientInvite(t) => t.on_timer(kind),
            Slot::ClientNonInvite(t) => t.on_timer(kind),
            Slot::ServerInvite(t) => t.on_timer(kind),
            Slot::ServerNonInvite(t) => t.on_timer(kind),
        }
    }

    fn on_transport_error(&mut self) -> Vec<Effect> {
        match self {
            Slot::ClientInvite(t) => t.on_transport_error(),
            Slot::ClientNonInvite(t) => t.on_transport_error(),
            _ => Vec::new(),
        }
    }
}

/// A live transaction plus where its bytes go: the destination address
/// and the listener they leave from. Timers fire long after the request
/// or response that created the entry, so this has to be stored
/// alongside the state machine rather than threaded through call by call.
struct Entry {
    slot: Slot,
    dest: SocketAddr,
    transport: Arc<dyn Transport>,
}

/// Owns every live transaction, the shared [`TimerQueue`], and the single
/// [`TransportSelector`] they send through (spec.md §5: "a single-
/// threaded cooperative event loop owning all mutable state"). Nothing
/// here is `Send`-shared beyond what callers do explicitly — the
/// [`crate::manager::TransactionManager`] is meant to live inside one
/// executive task, not behind a lock.
pub struct TransactionManager {
    transactions: HashMap<TransactionKey, Entry>,
    timers: TimerQueue,
    timer_tokens: HashMap<(TransactionKey, TimerKind), TimerToken>,
    transport: Arc<TransportSelector>,
    settings: TimerSettings,
    stray_response_policy: StrayResponsePolicy,
    tu_tx: mpsc::Sender<TransactionEvent>,
}

impl TransactionManager {
    /// Build a manager over `transport`, returning it alongside the
    /// receiving half of the TU event FIFO (spec.md §4.4's transactions
    /// hand events "up to the TU"; this channel is that pipe).
    pub fn new(transport: Arc<TransportSelector>, settings: TimerSettings) -> (Self, mpsc::Receiver<TransactionEvent>) {
        let (tu_tx, tu_rx) = mpsc::channel(256);
        let manager = TransactionManager {
            transactions: HashMap::new(),
            timers: TimerQueue::new(),
            timer_tokens: HashMap::new(),
            transport,
            settings,
            stray_response_policy: StrayResponsePolicy::default(),
            tu_tx,
        };
        (manager, tu_rx)
    }

    /// Override how unmatched responses are disposed of (spec.md §4.4
    /// "configurable strayResponse flag"); defaults to
    /// [`StrayResponsePolicy::Discard`].
    pub fn set_stray_response_policy(&mut self, policy: StrayResponsePolicy) {
        self.stray_response_policy = policy;
    }

    /// The deadline of the next pending timer, for the executive's
    /// `tokio::select!` to sleep until (spec.md §4.5
    /// `getTimeTillNextProcess`).
    pub fn next_timer_due(&mut self) -> Option<Instant> {
        self.timers.next_due()
    }

    /// Drive every timer that has already come due. Called by the
    /// executive after a `sleep_until(next_timer_due())` wakes up.
    pub async fn poll_timers(&mut self) {
        let now = Instant::now();
        loop {
            let Some((kind, key)) = self.timers.pop_due(now) else { break };
            let effects = match self.transactions.get_mut(&key) {
                Some(entry) => entry.slot.on_timer(kind),
                None => continue,
            };
            self.apply(key, effects).await;
        }
    }

    /// Hand a new outbound request to its (new) client transaction,
    /// selecting a transport/destination and generating a branch if the
    /// caller (typically the dialog layer) didn't already set one.
    pub async fn send_request(&mut self, mut request: SipMessage) -> Result<TransactionKey> {
        let (transport, dest) = self.transport.select_for(&request).await?;
        TransportSelector::rewrite_via_and_contact(&mut request, &transport, false)?;
        ensure_branch(&mut request)?;

        let key = TransactionKey::from_request(&request)
            .ok_or_else(|| Error::ProtocolViolation("outbound request missing Via/branch".into()))?;
        if self.transactions.contains_key(&key) {
            return Err(Error::DuplicateTransaction(key.to_string()));
        }

        let reliable = transport.is_reliable();
        let (slot, effects) = if key.method == Method::Invite {
            let (txn, effects) = ClientInviteTransaction::new(key.clone(), request, reliable, self.settings);
            (Slot::ClientInvite(txn), effects)
        } else {
            let (txn, effects) = ClientNonInviteTransaction::new(key.clone(), request, reliable, self.settings);
            (Slot::ClientNonInvite(txn), effects)
        };

        self.transactions.insert(key.clone(), Entry { slot, dest, transport });
        self.apply(key.clone(), effects).await;
        Ok(key)
    }

    /// The TU hands a response down for an existing server transaction to
    /// send (spec.md §6 `transaction.sendResponse`).
    pub async fn send_response(&mut self, key: &TransactionKey, response: SipMessage) -> Result<()> {
        let effects = match self.transactions.get_mut(key) {
            Some(entry) => match &mut entry.slot {
                Slot::ServerInvite(t) => t.on_tu_response(response),
                Slot::ServerNonInvite(t) => t.on_tu_response(response),
                _ => return Err(Error::ProtocolViolation(format!("{key} is not a server transaction"))),
            },
            None => return Err(Error::UnmatchedResponse(key.to_string())),
        };
        self.apply(key.clone(), effects).await;
        Ok(())
    }

    /// Feed one inbound message (already parsed and context-tagged by the
    /// transport layer) through transaction matching (spec.md §4.4
    /// matching rules, RFC 3261 §17.2.3/§17.1.3).
    pub async fn handle_incoming(&mut self, mut message: SipMessage, ctx: TransportContext) -> Result<()> {
        match &message.start_line {
            StartLine::Response(_) => self.handle_incoming_response(message).await,
            StartLine::Request(req) if req.method == Method::Ack => self.handle_incoming_ack(message, ctx).await,
            StartLine::Request(_) => self.handle_incoming_request(&mut message, ctx).await,
        }
    }

    async fn handle_incoming_response(&mut self, mut response: SipMessage) -> Result<()> {
        let key = TransactionKey::from_response(&mut response)
            .ok_or_else(|| Error::ProtocolViolation("response missing Via/CSeq".into()))?;

        let is_client_txn = matches!(
            self.transactions.get(&key).map(|e| &e.slot),
            Some(Slot::ClientInvite(_)) | Some(Slot::ClientNonInvite(_))
        );
        if !is_client_txn {
            if self.transactions.contains_key(&key) {
                warn!(%key, "response matched a server transaction, dropping");
            } else {
                debug!(%key, "stray response, no matching client transaction");
            }
            return self.dispose_stray(key, response).await;
        }

        let effects = match &mut self.transactions.get_mut(&key).expect("checked Some above").slot {
            Slot::ClientInvite(t) => t.on_response(response),
            Slot::ClientNonInvite(t) => t.on_response(response),
            _ => unreachable!("checked client-transaction kind above"),
        };
        self.apply(key, effects).await;
        Ok(())
    }

    /// Apply [`StrayResponsePolicy`] to a response that matched no live
    /// client transaction.
    async fn dispose_stray(&self, key: TransactionKey, response: SipMessage) -> Result<()> {
        if self.stray_response_policy == StrayResponsePolicy::Deliver {
            self.emit(TransactionEvent::StrayResponse { key, response }).await;
        }
        Ok(())
    }

    /// ACKs never create their own transaction. A non-2xx ACK is matched
    /// to the server INVITE transaction it confirms (same branch, method
    /// substituted to INVITE); a 2xx ACK has no server transaction at all
    /// (it was already Terminated on the 2xx) and is forwarded straight
    /// to the TU for the dialog layer to deal with (spec.md: "ACK
    /// matching is the TU's problem").
    async fn handle_incoming_ack(&mut self, request: SipMessage, ctx: TransportContext) -> Result<()> {
        let invite_key = ack_key(&request).ok_or_else(|| Error::ProtocolViolation("ACK missing Via/branch".into()))?;
        if let Some(entry) = self.transactions.get_mut(&invite_key) {
            if let Slot::ServerInvite(t) = &mut entry.slot {
                let effects = t.on_ack();
                self.apply(invite_key, effects).await;
                return Ok(());
            }
        }
        let relay_key = TransactionKey::from_request(&request)
            .unwrap_or_else(|| TransactionKey::new(invite_key.branch.clone(), invite_key.sent_by.clone(), Method::Ack));
        let _ = ctx;
        self.emit(TransactionEvent::Request { key: relay_key, request }).await;
        Ok(())
    }

    async fn handle_incoming_request(&mut self, request: &mut SipMessage, ctx: TransportContext) -> Result<()> {
        let key = TransactionKey::from_request(request)
            .ok_or_else(|| Error::ProtocolViolation("request missing Via/branch".into()))?;

        if let Some(entry) = self.transactions.get_mut(&key) {
            let effects = match &mut entry.slot {
                Slot::ServerInvite(t) => t.on_request_retransmit(),
                Slot::ServerNonInvite(t) => t.on_request_retransmit(),
                _ => Vec::new(),
            };
            self.apply(key, effects).await;
            return Ok(());
        }

        let transport = self
            .transport
            .transport_for_context(&ctx)
            .await
            .ok_or_else(|| Error::ProtocolViolation("no listener for inbound context".into()))?;
        let reliable = transport.is_reliable();
        let slot = if key.method == Method::Invite {
            Slot::ServerInvite(ServerInviteTransaction::new(key.clone(), reliable, self.settings))
        } else {
            Slot::ServerNonInvite(ServerNonInviteTransaction::new(key.clone(), reliable, self.settings))
        };
        self.transactions.insert(key.clone(), Entry { slot, dest: ctx.peer_address, transport });
        self.emit(TransactionEvent::Request { key, request: request.clone() }).await;
        Ok(())
    }

    /// A transport-layer send failure for a specific transaction
    /// (surfaced by the executive after a `Transport::send` call it made
    /// on the manager's behalf returns an error).
    pub async fn report_transport_error(&mut self, key: &TransactionKey) {
        let effects = match self.transactions.get_mut(key) {
            Some(entry) => entry.slot.on_transport_error(),
            None => return,
        };
        self.apply(key.clone(), effects).await;
    }

    async fn apply(&mut self, key: TransactionKey, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(bytes) => {
                    let Some(entry) = self.transactions.get(&key) else { continue };
                    if let Err(err) = entry.transport.send(entry.dest, &bytes).await {
                        warn!(%key, %err, "transport send failed");
                        let retry = self.transactions.get_mut(&key).map(|e| e.slot.on_transport_error());
                        if let Some(retry) = retry {
                            // One level of recursion: on_transport_error never
                            // itself produces a Send effect, so this can't loop.
                            Box::pin(self.apply(key.clone(), retry)).await;
                        }
                    }
                }
                Effect::Emit(event) => self.emit(event).await,
                Effect::Schedule(kind, delay) => {
                    if let Some(old) = self.timer_tokens.remove(&(key.clone(), kind)) {
                        self.timers.cancel(old);
                    }
                    let token = self.timers.schedule(delay, kind, key.clone());
                    self.timer_tokens.insert((key.clone(), kind), token);
                }
                Effect::CancelTimer(kind) => {
                    if let Some(token) = self.timer_tokens.remove(&(key.clone(), kind)) {
                        self.timers.cancel(token);
                    }
                }
                Effect::CancelAll => {
                    self.timers.cancel_all_for(&key);
                    self.timer_tokens.retain(|(k, _), _| k != &key);
                    if self.transactions.get(&key).map(|e| e.slot.is_terminated()).unwrap_or(false) {
                        self.transactions.remove(&key);
                    }
                }
            }
        }
    }

    async fn emit(&self, event: TransactionEvent) {
        if self.tu_tx.send(event).await.is_err() {
            debug!("TU event dropped, receiver gone");
        }
    }
}

/// The server INVITE transaction key a non-2xx ACK confirms: same
/// branch/sent-by as the ACK's own Via, but `Method::Invite` substituted
/// for the ACK's `Method::Ack` (RFC 3261 §17.2.3).
fn ack_key(ack: &SipMessage) -> Option<TransactionKey> {
    let mut field = ack.header(&HeaderName::Via)?.clone();
    let via = match field.typed().ok()? {
        TypedHeader::Via(v) => v,
        _ => return None,
    };
    let branch = via.branch()?.to_string();
    let sent_by = format!("{}:{}", via.sent_host, via.effective_port());
    Some(TransactionKey::new(branch, sent_by, Method::Invite))
}

fn ensure_branch(request: &mut SipMessage) -> Result<()> {
    let field = request
        .header_mut(&HeaderName::Via)
        .ok_or_else(|| Error::ProtocolViolation("request has no Via to attach a branch to".into()))?;
    let mut via = match field.typed().map_err(rvoip_sip_core::error::Error::Parse)?.clone() {
        TypedHeader::Via(via) => via,
        _ => return Ok(()),
    };
    if via.branch().is_none() {
        via.set_branch(generate_branch());
        field.set_typed(TypedHeader::Via(via));
    }
    Ok(())
}

/// RFC 3261 §8.1.1.7: a branch beginning with the magic cookie
/// `z9hG4bK`, unique enough across a single stack's lifetime.
fn generate_branch() -> String {
    let mut bytes = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut out = String::from("z9hG4bK");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
