use std::fmt;

use rvoip_sip_core::message::SipMessage;
use rvoip_sip_core::types::header::{HeaderName, TypedHeader};
use rvoip_sip_core::types::method::Method;

/// A transaction's identity: `(branch, topmost Via sent-by, method)`
/// (spec.md §3 Transaction, §4.4 "Four machines, each keyed by
/// `{branch, sent-by, method}`", RFC 3261 §17.2.3). ACK to a non-2xx
/// matches the *INVITE* transaction it acknowledges, which the manager
/// handles by looking a server/client INVITE transaction up with
/// `Method::Invite` substituted for `Method::Ack` — see
/// [`crate::manager::TransactionManager`] — rather than by weakening
/// this key's equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub branch: String,
    pub sent_by: String,
    pub method: Method,
}

impl TransactionKey {
    pub fn new(branch: impl Into<String>, sent_by: impl Into<String>, method: Method) -> Self {
        TransactionKey { branch: branch.into(), sent_by: sent_by.into(), method }
    }

    /// Derive the key a *request* establishes or is routed by: its
    /// topmost Via branch/sent-by and its CSeq method (not its
    /// request-line method, so a retransmitted ACK to a non-2xx carries
    /// `Method::Ack` here and the manager does the INVITE substitution).
    pub fn from_request(msg: &SipMessage) -> Option<TransactionKey> {
        let via = top_via(msg)?;
        let method = msg.request_line()?.method.clone();
        Some(TransactionKey::new(via.branch()?.to_string(), via_sent_by(&via), method))
    }

    /// Derive the key a *response* matches against: topmost Via
    /// branch/sent-by plus the CSeq method (spec.md §4.4 matching
    /// rules).
    pub fn from_response(msg: &mut SipMessage) -> Option<TransactionKey> {
        let via = top_via(msg)?;
        let sent_by = via_sent_by(&via);
        let branch = via.branch()?.to_string();
        let cseq_field = msg.header_mut(&HeaderName::CSeq)?;
        let method = match cseq_field.typed().ok()? {
            TypedHeader::CSeq(cseq) => cseq.method.clone(),
            _ => return None,
        };
        Some(TransactionKey::new(branch, sent_by, method))
    }
}

fn top_via(msg: &SipMessage) -> Option<rvoip_sip_core::types::via::Via> {
    let mut field = msg.header(&HeaderName::Via)?.clone();
    match field.typed().ok()? {
        TypedHeader::Via(v) => Some(v.clone()),
        _ => None,
    }
}

fn via_sent_by(via: &rvoip_sip_core::types::via::Via) -> String {
    format!("{}:{}", via.sent_host, via.effective_port())
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.method.as_str(), self.sent_by, self.branch)
    }
}
