//! Allocation-light SIP (RFC 3261) message parsing and rendering.
//!
//! This crate owns exactly the wire-format layer: a zero-copy scanning
//! primitive ([`cursor::ParseCursor`]), the typed parser categories built
//! on it ([`types`]), and the message container that ties a start line,
//! headers, and body together ([`message::SipMessage`]). Transaction
//! state, dialogs, and transport I/O live in the crates built on top of
//! this one.

pub mod cursor;
pub mod error;
pub mod message;
pub mod types;

pub mod prelude {
    pub use crate::cursor::ParseCursor;
    pub use crate::error::{Error, ParseError, Result};
    pub use crate::message::{SipMessage, StartLine};
    pub use crate::types::call_id::CallId;
    pub use crate::types::cseq::CSeq;
    pub use crate::types::header::{HeaderField, HeaderName, TypedHeader};
    pub use crate::types::integer::IntegerCategory;
    pub use crate::types::method::Method;
    pub use crate::types::mime::Mime;
    pub use crate::types::name_addr::NameAddr;
    pub use crate::types::params::Params;
    pub use crate::types::request_line::RequestLine;
    pub use crate::types::status::StatusCode;
    pub use crate::types::status_line::StatusLine;
    pub use crate::types::string_header::StringCategory;
    pub use crate::types::token::Token;
    pub use crate::types::uri::{Scheme, Uri};
    pub use crate::types::via::Via;
}
