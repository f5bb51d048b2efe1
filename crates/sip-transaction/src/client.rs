use std::time::Duration;

use rvoip_sip_core::message::{SipMessage, StartLine};
use rvoip_sip_core::types::header::{HeaderName, TypedHeader};
use rvoip_sip_core::types::integer::IntegerCategory;
use rvoip_sip_core::types::method::Method;

use crate::config::TimerSettings;
use crate::effect::Effect;
use crate::event::TransactionEvent;
use crate::key::TransactionKey;
use crate::timer::TimerKind;

/// Build the ACK a client INVITE transaction sends for a non-2xx final
/// response (RFC 3261 §17.1.1.3). The transaction owns this message and
/// resends the *same* bytes for every retransmitted final response
/// (spec.md §4.4: "ACK ... is reused for every retransmitted final
/// response") rather than rebuilding it each time.
fn build_ack(invite: &SipMessage, response: &SipMessage) -> SipMessage {
    let invite_rl = invite.request_line().expect("transaction request is always a request");
    let mut ack = SipMessage::new_request(rvoip_sip_core::types::request_line::RequestLine::new(
        Method::Ack,
        invite_rl.uri.clone(),
    ));
    if let Some(via) = invite.header(&HeaderName::Via) {
        ack.push_header(via.clone());
    }
    for route in invite.headers_named(&HeaderName::Route) {
        ack.push_header(route.clone());
    }
    if let Some(f) = invite.header(&HeaderName::From) {
        ack.push_header(f.clone());
    }
    if let Some(t) = response.header(&HeaderName::To) {
        ack.push_header(t.clone());
    } else if let Some(t) = invite.header(&HeaderName::To) {
        ack.push_header(t.clone());
    }
    if let Some(c) = invite.header(&HeaderName::CallId) {
        ack.push_header(c.clone());
    }
    let seq = match invite.header(&HeaderName::CSeq).cloned() {
        Some(mut field) => match field.typed() {
            Ok(TypedHeader::CSeq(cseq)) => cseq.sequence,
            _ => 1,
        },
        None => 1,
    };
    ack.push_header(rvoip_sip_core::types::header::HeaderField::from_typed(
        HeaderName::CSeq,
        TypedHeader::CSeq(rvoip_sip_core::types::cseq::CSeq::new(seq, Method::Ack)),
    ));
    ack.push_header(rvoip_sip_core::types::header::HeaderField::from_typed(
        HeaderName::MaxForwards,
        TypedHeader::MaxForwards(IntegerCategory::new(70)),
    ));
    ack.push_header(rvoip_sip_core::types::header::HeaderField::from_typed(
        HeaderName::ContentLength,
        TypedHeader::ContentLength(IntegerCategory::new(0)),
    ));
    ack
}

fn synthetic_response(invite: &SipMessage, code: rvoip_sip_core::types::status::StatusCode) -> SipMessage {
    let mut resp = SipMessage::new_response(rvoip_sip_core::types::status_line::StatusLine::new(code));
    for name in [HeaderName::Via, HeaderName::From, HeaderName::To, HeaderName::CallId, HeaderName::CSeq] {
        if let Some(h) = invite.header(&name) {
            resp.push_header(h.clone());
        }
    }
    resp.push_header(rvoip_sip_core::types::header::HeaderField::from_typed(
        HeaderName::ContentLength,
        TypedHeader::ContentLength(IntegerCategory::new(0)),
    ));
    resp
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientInviteState {
    Calling,
    Proceeding,
    Completed,
    Terminated,
}

/// RFC 3261 §17.1.1: the client INVITE transaction (spec.md §4.4).
pub struct ClientInviteTransaction {
    pub key: TransactionKey,
    pub state: ClientInviteState,
    request: SipMessage,
    reliable: bool,
    settings: TimerSettings,
    retransmit_interval: Duration,
    ack: Option<SipMessage>,
}

impl ClientInviteTransaction {
    pub fn new(key: TransactionKey, request: SipMessage, reliable: bool, settings: TimerSettings) -> (Self, Vec<Effect>) {
        let mut effects = vec![Effect::send(&request)];
        if !reliable {
            effects.push(Effect::Schedule(TimerKind::A, settings.t1));
        }
        effects.push(Effect::Schedule(TimerKind::B, settings.timeout()));
        let txn = ClientInviteTransaction {
            key,
            state: ClientInviteState::Calling,
            request,
            reliable,
            settings,
            retransmit_interval: settings.t1,
            ack: None,
        };
        (txn, effects)
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ClientInviteState::Terminated
    }

    pub fn on_timer(&mut self, kind: TimerKind) -> Vec<Effect> {
        match (kind, self.state) {
            (TimerKind::A, ClientInviteState::Calling) => {
                self.retransmit_interval = (self.retransmit_interval * 2).min(self.settings.t2);
                vec![Effect::send(&self.request), Effect::Schedule(TimerKind::A, self.retransmit_interval)]
            }
            (TimerKind::B, ClientInviteState::Calling) | (TimerKind::B, ClientInviteState::Proceeding) => {
                self.state = ClientInviteState::Terminated;
                vec![
                    Effect::Emit(TransactionEvent::TimedOut { key: self.key.clone(), response: self.timeout_response() }),
                    Effect::CancelAll,
                    Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() }),
                ]
            }
            (TimerKind::D, ClientInviteState::Completed) => {
                self.state = ClientInviteState::Terminated;
                vec![Effect::CancelAll, Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() })]
            }
            _ => Vec::new(),
        }
    }

    /// A transport send failure before any final response arrived
    /// (spec.md §7 `TransportError`: "client transactions surface as
    /// synthetic 503 to the TU if no response has arrived").
    pub fn on_transport_error(&mut self) -> Vec<Effect> {
        if self.state == ClientInviteState::Terminated || self.state == ClientInviteState::Completed {
            return Vec::new();
        }
        self.state = ClientInviteState::Terminated;
        let response = synthetic_response(&self.request, rvoip_sip_core::types::status::StatusCode::SERVICE_UNAVAILABLE);
        vec![
            Effect::Emit(TransactionEvent::TransportFailed { key: self.key.clone(), response }),
            Effect::CancelAll,
            Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() }),
        ]
    }

    pub fn on_response(&mut self, response: SipMessage) -> Vec<Effect> {
        let status = match &response.start_line {
            StartLine::Response(sl) => sl.status_code,
            StartLine::Request(_) => return Vec::new(),
        };

        match self.state {
            ClientInviteState::Calling | ClientInviteState::Proceeding => {
                if status.is_provisional() {
                    self.state = ClientInviteState::Proceeding;
                    vec![
                        Effect::CancelTimer(TimerKind::A),
                        Effect::Emit(TransactionEvent::Provisional { key: self.key.clone(), response }),
                    ]
                } else if status.is_success() {
                    self.state = ClientInviteState::Terminated;
                    vec![
                        Effect::Emit(TransactionEvent::Final { key: self.key.clone(), response }),
                        Effect::CancelAll,
                        Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() }),
                    ]
                } else {
                    let ack = build_ack(&self.request, &response);
                    let effects = vec![
                        Effect::send(&ack),
                        Effect::Emit(TransactionEvent::Final { key: self.key.clone(), response }),
                        Effect::CancelTimer(TimerKind::A),
                        Effect::CancelTimer(TimerKind::B),
                        Effect::Schedule(TimerKind::D, self.settings.timer_d(self.reliable)),
                    ];
                    self.ack = Some(ack);
                    self.state = ClientInviteState::Completed;
                    effects
                }
            }
            ClientInviteState::Completed => {
                // Retransmitted final response: resend the stored ACK,
                // never re-emit to the TU (spec.md §4.4).
                if let Some(ack) = &self.ack {
                    vec![Effect::send(ack)]
                } else {
                    Vec::new()
                }
            }
            ClientInviteState::Terminated => Vec::new(),
        }
    }

    /// Synthesize the 408 this transaction would emit on Timer B, for
    /// callers (the manager) that want to hand a uniform final response
    /// to the TU rather than a bare `TimedOut` marker.
    pub fn timeout_response(&self) -> SipMessage {
        synthetic_response(&self.request, rvoip_sip_core::types::status::StatusCode::REQUEST_TIMEOUT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientNonInviteState {
    Trying,
    Proceeding,
    Completed,
    Terminated,
}

/// RFC 3261 §17.1.2: the client non-INVITE transaction (spec.md §4.4).
pub struct ClientNonInviteTransaction {
    pub key: TransactionKey,
    pub state: ClientNonInviteState,
    request: SipMessage,
    reliable: bool,
    settings: TimerSettings,
    retransmit_interval: Duration,
}

impl ClientNonInviteTransaction {
    pub fn new(key: TransactionKey, request: SipMessage, reliable: bool, settings: TimerSettings) -> (Self, Vec<Effect>) {
        let mut effects = vec![Effect::send(&request)];
        if !reliable {
            effects.push(Effect::Schedule(TimerKind::E, settings.t1));
        }
        effects.push(Effect::Schedule(TimerKind::F, settings.timeout()));
        let txn = ClientNonInviteTransaction {
            key,
            state: ClientNonInviteState::Trying,
            request,
            reliable,
            settings,
            retransmit_interval: settings.t1,
        };
        (txn, effects)
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ClientNonInviteState::Terminated
    }

    pub fn on_timer(&mut self, kind: TimerKind) -> Vec<Effect> {
        match (kind, self.state) {
            (TimerKind::E, ClientNonInviteState::Trying) | (TimerKind::E, ClientNonInviteState::Proceeding) => {
                self.retransmit_interval = (self.retransmit_interval * 2).min(self.settings.t2);
                vec![Effect::send(&self.request), Effect::Schedule(TimerKind::E, self.retransmit_interval)]
            }
            (TimerKind::F, ClientNonInviteState::Trying) | (TimerKind::F, ClientNonInviteState::Proceeding) => {
                self.state = ClientNonInviteState::Terminated;
                vec![
                    Effect::Emit(TransactionEvent::TimedOut { key: self.key.clone(), response: self.timeout_response() }),
                    Effect::CancelAll,
                    Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() }),
                ]
            }
            (TimerKind::K, ClientNonInviteState::Completed) => {
                self.state = ClientNonInviteState::Terminated;
                vec![Effect::CancelAll, Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() })]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_transport_error(&mut self) -> Vec<Effect> {
        if matches!(self.state, ClientNonInviteState::Terminated | ClientNonInviteState::Completed) {
            return Vec::new();
        }
        self.state = ClientNonInviteState::Terminated;
        let response = synthetic_response(&self.request, rvoip_sip_core::types::status::StatusCode::SERVICE_UNAVAILABLE);
        vec![
            Effect::Emit(TransactionEvent::TransportFailed { key: self.key.clone(), response }),
            Effect::CancelAll,
            Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() }),
        ]
    }

    pub fn on_response(&mut self, response: SipMessage) -> Vec<Effect> {
        let status = match &response.start_line {
            StartLine::Response(sl) => sl.status_code,
            StartLine::Request(_) => return Vec::new(),
        };
        match self.state {
            ClientNonInviteState::Trying | ClientNonInviteState::Proceeding => {
                if status.is_provisional() {
                    self.state = ClientNonInviteState::Proceeding;
                    vec![Effect::Emit(TransactionEvent::Provisional { key: self.key.clone(), response })]
                } else {
                    self.state = ClientNonInviteState::Completed;
                    vec![
                        Effect::Emit(TransactionEvent::Final { key: self.key.clone(), response }),
                        Effect::CancelTimer(TimerKind::E),
                        Effect::CancelTimer(TimerKind::F),
                        Effect::Schedule(TimerKind::K, self.settings.timer_k(self.reliable)),
                    ]
                }
            }
            ClientNonInviteState::Completed | ClientNonInviteState::Terminated => Vec::new(),
        }
    }

    pub fn timeout_response(&self) -> SipMessage {
        synthetic_response(&self.request, rvoip_sip_core::types::status::StatusCode::REQUEST_TIMEOUT)
    }
}
