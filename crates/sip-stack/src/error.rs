use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors the [`crate::executive::Executive`] and [`crate::tuim::TuIM`]
/// surface. Per spec.md §7, none of these are fatal to the stack: every
/// collaborator crate's error is wrapped here rather than unwound, and
/// the executive's own run loop logs and continues on anything but a
/// genuine invariant violation.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] rvoip_sip_transport::error::Error),

    #[error(transparent)]
    Transaction(#[from] rvoip_sip_transaction::error::Error),

    #[error(transparent)]
    Dialog(#[from] rvoip_sip_dialog::error::Error),

    #[error(transparent)]
    Message(#[from] rvoip_sip_core::error::Error),

    #[error("no dialog set for {0}")]
    UnknownDialogSet(rvoip_sip_dialog::id::DialogSetId),

    #[error("no dialog {0} in its set")]
    UnknownDialog(rvoip_sip_dialog::id::DialogId),

    #[error("not registered")]
    NotRegistered,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}
