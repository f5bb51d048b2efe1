use rvoip_sip_core::message::SipMessage;

use crate::key::TransactionKey;

/// What a transaction hands up to the TU (spec.md §6 `stack.receive`,
/// §7 error taxonomy). A provisional/final response is delivered as-is;
/// `TimedOut`/`TransportFailed` carry the synthetic final response the
/// transaction itself manufactures (408/503) so the TU sees one uniform
/// "final response" shape regardless of whether a peer ever answered.
#[derive(Debug, Clone)]
pub enum TransactionEvent {
    /// A provisional (1xx) response, passed through unmodified.
    Provisional { key: TransactionKey, response: SipMessage },
    /// A final response (2xx-6xx), either the peer's or a synthetic one.
    Final { key: TransactionKey, response: SipMessage },
    /// An inbound request this transaction was created to serve,
    /// handed to the TU exactly once (retransmissions are absorbed by
    /// the state machine and never reach this point, spec.md §4.4).
    Request { key: TransactionKey, request: SipMessage },
    /// Timer B/F/H fired with no final response ever received
    /// (spec.md §7 `TransactionTimeout`). `response` is the synthetic
    /// 408 this transaction manufactures so the TU sees the same shape
    /// it would for a peer-originated final response (S3).
    TimedOut { key: TransactionKey, response: SipMessage },
    /// The transport reported a send failure with no final response yet
    /// (spec.md §7 `TransportError`). `response` is a synthetic 503.
    TransportFailed { key: TransactionKey, response: SipMessage },
    /// The transaction reached Terminated and its linger timer fired;
    /// it no longer exists in the map (spec.md §8 property 7).
    Terminated { key: TransactionKey },
    /// A response matched no live client transaction, delivered anyway
    /// because [`crate::config::StrayResponsePolicy::Deliver`] is in
    /// effect (spec.md §4.4 "configurable strayResponse flag"). `key` is
    /// the transaction identity the response carried, even though no
    /// such transaction exists.
    StrayResponse { key: TransactionKey, response: SipMessage },
}
