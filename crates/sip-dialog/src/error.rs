use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors a [`crate::dialog::Dialog`] or [`crate::set::DialogSet`] can
/// raise. Per spec.md §7, a `ProtocolViolation` here (CSeq regression,
/// mismatched tags, response to a dialog that no longer exists) is
/// logged and the offending message discarded — it never propagates as
/// a stack-fatal error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Message(#[from] rvoip_sip_core::error::Error),

    #[error("request is missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("no dialog matches ({call_id}, {local_tag}, {remote_tag:?})")]
    UnknownDialog { call_id: String, local_tag: String, remote_tag: Option<String> },

    #[error("dialog set {0} has no pending offer/answer to fix up")]
    NoPendingOffer(String),
}
