use thiserror::Error;

/// Result alias used throughout `rvoip-sip-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// A parse failure localized to a file/line of *this* crate and a byte
/// offset into the buffer being scanned (spec.md §4.1: `ParseError{file,
/// line, reason, offset}`).
///
/// `file`/`line` identify where in the parser the failure was raised, not
/// a location in the SIP message — they are for debugging a malformed
/// grammar rule, the way `ParseBuffer` assertions did in the original.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at {file}:{line}: {reason} (offset {offset})")]
pub struct ParseError {
    pub file: &'static str,
    pub line: u32,
    pub reason: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(file: &'static str, line: u32, reason: impl Into<String>, offset: usize) -> Self {
        ParseError { file, line, reason: reason.into(), offset }
    }
}

/// Raise a [`ParseError`] tagged with the call site, mirroring
/// `ParseBuffer::fail` in the original source.
#[macro_export]
macro_rules! parse_fail {
    ($cursor:expr, $($arg:tt)*) => {
        return Err($crate::error::ParseError::new(
            file!(),
            line!(),
            format!($($arg)*),
            $cursor.position(),
        ))
    };
}

/// Errors surfaced by `rvoip-sip-core`. Per spec.md §7, a [`Error::Parse`]
/// is always localized to the offending header/start-line and is never
/// fatal to the caller — it is up to the caller (SipMessage construction,
/// or higher layers) to decide whether to discard or deliver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("header {0} present more than once where at most one is allowed")]
    DuplicateSingletonHeader(&'static str),

    #[error("Content-Length mismatch: header says {expected}, body is {actual} bytes")]
    ContentLengthMismatch { expected: usize, actual: usize },

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
}
