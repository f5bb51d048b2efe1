use std::time::Duration;

use rvoip_sip_core::message::{SipMessage, StartLine};

use crate::config::TimerSettings;
use crate::effect::Effect;
use crate::event::TransactionEvent;
use crate::key::TransactionKey;
use crate::timer::TimerKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerInviteState {
    Proceeding,
    Completed,
    Confirmed,
    Terminated,
}

/// RFC 3261 §17.2.1: the server INVITE transaction (spec.md §4.4). A
/// 2xx response passed by the TU terminates the transaction
/// immediately — ACK matching for 2xx is end-to-end and is the
/// dialog layer's problem, not this transaction's (spec.md: "ACK
/// matching is the TU's problem"). A 3xx-6xx response starts the
/// retransmit/wait-for-ACK dance (Completed → Confirmed).
pub struct ServerInviteTransaction {
    pub key: TransactionKey,
    pub state: ServerInviteState,
    reliable: bool,
    settings: TimerSettings,
    last_response: Option<SipMessage>,
    retransmit_interval: Duration,
}

impl ServerInviteTransaction {
    pub fn new(key: TransactionKey, reliable: bool, settings: TimerSettings) -> Self {
        ServerInviteTransaction {
            key,
            state: ServerInviteState::Proceeding,
            reliable,
            settings,
            last_response: None,
            retransmit_interval: settings.t1,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ServerInviteState::Terminated
    }

    /// A response the TU hands down for this transaction to send.
    pub fn on_tu_response(&mut self, response: SipMessage) -> Vec<Effect> {
        let status = match &response.start_line {
            StartLine::Response(sl) => sl.status_code,
            StartLine::Request(_) => return Vec::new(),
        };
        match self.state {
            ServerInviteState::Proceeding => {
                if status.is_provisional() {
                    let effects = vec![Effect::send(&response)];
                    self.last_response = Some(response);
                    effects
                } else if status.is_success() {
                    self.state = ServerInviteState::Terminated;
                    let send = Effect::send(&response);
                    vec![send, Effect::CancelAll, Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() })]
                } else {
                    self.state = ServerInviteState::Completed;
                    let mut effects = vec![Effect::send(&response)];
                    if !self.reliable {
                        effects.push(Effect::Schedule(TimerKind::G, self.settings.t1));
                    }
                    effects.push(Effect::Schedule(TimerKind::H, self.settings.timeout()));
                    self.last_response = Some(response);
                    effects
                }
            }
            _ => Vec::new(),
        }
    }

    /// A retransmitted INVITE while this transaction is outstanding
    /// (RFC 3261 §17.2.1: resend whatever was last sent).
    pub fn on_request_retransmit(&mut self) -> Vec<Effect> {
        match (&self.state, &self.last_response) {
            (ServerInviteState::Proceeding, Some(resp)) | (ServerInviteState::Completed, Some(resp)) => {
                vec![Effect::send(resp)]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_ack(&mut self) -> Vec<Effect> {
        if self.state != ServerInviteState::Completed {
            return Vec::new();
        }
        self.state = ServerInviteState::Confirmed;
        vec![
            Effect::CancelTimer(TimerKind::G),
            Effect::CancelTimer(TimerKind::H),
            Effect::Schedule(TimerKind::I, self.settings.timer_i(self.reliable)),
        ]
    }

    pub fn on_timer(&mut self, kind: TimerKind) -> Vec<Effect> {
        match (kind, self.state) {
            (TimerKind::G, ServerInviteState::Completed) => {
                self.retransmit_interval = (self.retransmit_interval * 2).min(self.settings.t2);
                let resp = self.last_response.clone();
                let mut effects = Vec::new();
                if let Some(resp) = resp {
                    effects.push(Effect::send(&resp));
                }
                effects.push(Effect::Schedule(TimerKind::G, self.retransmit_interval));
                effects
            }
            (TimerKind::H, ServerInviteState::Completed) => {
                self.state = ServerInviteState::Terminated;
                vec![Effect::CancelAll, Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() })]
            }
            (TimerKind::I, ServerInviteState::Confirmed) => {
                self.state = ServerInviteState::Terminated;
                vec![Effect::CancelAll, Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() })]
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerNonInviteState {
    Trying,
    Proceeding,
    Completed,
    Terminated,
}

/// RFC 3261 §17.2.2: the server non-INVITE transaction (spec.md §4.4).
pub struct ServerNonInviteTransaction {
    pub key: TransactionKey,
    pub state: ServerNonInviteState,
    reliable: bool,
    settings: TimerSettings,
    last_response: Option<SipMessage>,
}

impl ServerNonInviteTransaction {
    pub fn new(key: TransactionKey, reliable: bool, settings: TimerSettings) -> Self {
        ServerNonInviteTransaction {
            key,
            state: ServerNonInviteState::Trying,
            reliable,
            settings,
            last_response: None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ServerNonInviteState::Terminated
    }

    pub fn on_tu_response(&mut self, response: SipMessage) -> Vec<Effect> {
        let status = match &response.start_line {
            StartLine::Response(sl) => sl.status_code,
            StartLine::Request(_) => return Vec::new(),
        };
        match self.state {
            ServerNonInviteState::Trying | ServerNonInviteState::Proceeding => {
                if status.is_provisional() {
                    self.state = ServerNonInviteState::Proceeding;
                    let effects = vec![Effect::send(&response)];
                    self.last_response = Some(response);
                    effects
                } else {
                    self.state = ServerNonInviteState::Completed;
                    let effects = vec![Effect::send(&response), Effect::Schedule(TimerKind::J, self.settings.timer_j(self.reliable))];
                    self.last_response = Some(response);
                    effects
                }
            }
            _ => Vec::new(),
        }
    }

    /// A retransmitted request while a response has already been sent.
    pub fn on_request_retransmit(&mut self) -> Vec<Effect> {
        match &self.last_response {
            Some(resp) if self.state != ServerNonInviteState::Trying => vec![Effect::send(resp)],
            _ => Vec::new(),
        }
    }

    pub fn on_timer(&mut self, kind: TimerKind) -> Vec<Effect> {
        match (kind, self.state) {
            (TimerKind::J, ServerNonInviteState::Completed) => {
                self.state = ServerNonInviteState::Terminated;
                vec![Effect::CancelAll, Effect::Emit(TransactionEvent::Terminated { key: self.key.clone() })]
            }
            _ => Vec::new(),
        }
    }
}
