use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors a transaction or the [`crate::manager::TransactionManager`]
/// can raise. Per spec.md §7, none of these are fatal to the stack —
/// every variant here is either converted into a TU-visible event
/// (`TransactionTimeout` becomes a synthetic 408, `Transport` becomes a
/// synthetic 503) or logged and dropped (`ProtocolViolation`,
/// `UnmatchedResponse`).
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] rvoip_sip_transport::error::Error),

    #[error(transparent)]
    Message(#[from] rvoip_sip_core::error::Error),

    #[error("transaction {0} timed out")]
    Timeout(String),

    #[error("no transaction matches {0}")]
    UnmatchedResponse(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("transaction {0} already exists")]
    DuplicateTransaction(String),
}
