use std::time::Duration;

use rvoip_sip_core::message::SipMessage;

use crate::event::TransactionEvent;
use crate::timer::TimerKind;

/// What a transaction's step function asks its owner (the
/// [`crate::manager::TransactionManager`]) to do. A single inbound
/// event (message, timer fire) can produce more than one effect — e.g.
/// a non-2xx final response produces a `Send` (the generated ACK), an
/// `Emit`, and a `Schedule(D, ...)` all at once — so every `on_*`
/// method returns a `Vec<Effect>` rather than a single value.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Hand wire bytes to the transport layer.
    Send(Vec<u8>),
    /// Hand an event up to the TU.
    Emit(TransactionEvent),
    /// (Re)schedule a named timer, replacing any previous instance of
    /// the same kind for this transaction.
    Schedule(TimerKind, Duration),
    /// Cancel a specific named timer for this transaction, if pending.
    CancelTimer(TimerKind),
    /// Cancel every timer this transaction owns (reaching Terminated).
    CancelAll,
}

impl Effect {
    pub fn send(msg: &SipMessage) -> Effect {
        Effect::Send(msg.encode_bytes())
    }
}
