use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::types::call_id::CallId;
use crate::types::cseq::CSeq;
use crate::types::integer::IntegerCategory;
use crate::types::mime::Mime;
use crate::types::name_addr::NameAddr;
use crate::types::string_header::StringCategory;
use crate::types::token::Token;
use crate::types::via::Via;

/// Every header name this stack understands structurally, plus `Other`
/// for anything it only stores as free text (spec.md §4.2/§9: the
/// parser categories list is closed, but unrecognised header names must
/// still round-trip, not be dropped).
///
/// Compact forms (RFC 3261 §7.3.3, e.g. `v` for `Via`) are accepted on
/// parse and normalised to the long form internally; `encode` always
/// emits the long form, matching how this stack's wire layer already
/// normalises everything else it touches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderName {
    Via,
    To,
    From,
    CallId,
    CSeq,
    Contact,
    MaxForwards,
    ContentLength,
    ContentType,
    Route,
    RecordRoute,
    Expires,
    Supported,
    Require,
    Allow,
    UserAgent,
    Server,
    Subject,
    Organization,
    Event,
    SubscriptionState,
    Accept,
    Other(String),
}

impl HeaderName {
    pub fn as_str(&self) -> &str {
        match self {
            HeaderName::Via => "Via",
            HeaderName::To => "To",
            HeaderName::From => "From",
            HeaderName::CallId => "Call-ID",
            HeaderName::CSeq => "CSeq",
            HeaderName::Contact => "Contact",
            HeaderName::MaxForwards => "Max-Forwards",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::ContentType => "Content-Type",
            HeaderName::Route => "Route",
            HeaderName::RecordRoute => "Record-Route",
            HeaderName::Expires => "Expires",
            HeaderName::Supported => "Supported",
            HeaderName::Require => "Require",
            HeaderName::Allow => "Allow",
            HeaderName::UserAgent => "User-Agent",
            HeaderName::Server => "Server",
            HeaderName::Subject => "Subject",
            HeaderName::Organization => "Organization",
            HeaderName::Event => "Event",
            HeaderName::SubscriptionState => "Subscription-State",
            HeaderName::Accept => "Accept",
            HeaderName::Other(name) => name.as_str(),
        }
    }

    /// True for headers that MUST NOT occur more than once in a message.
    /// `SipMessage::parse_with` uses this to collapse a duplicate down to
    /// its first occurrence rather than carrying both through to `encode`.
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            HeaderName::To
                | HeaderName::From
                | HeaderName::CallId
                | HeaderName::CSeq
                | HeaderName::MaxForwards
                | HeaderName::ContentLength
                | HeaderName::ContentType
        )
    }

    pub fn parse(bytes: &[u8]) -> HeaderName {
        let s = String::from_utf8_lossy(bytes);
        match s.as_ref() {
            _ if s.eq_ignore_ascii_case("via") || s.eq_ignore_ascii_case("v") => HeaderName::Via,
            _ if s.eq_ignore_ascii_case("to") || s.eq_ignore_ascii_case("t") => HeaderName::To,
            _ if s.eq_ignore_ascii_case("from") || s.eq_ignore_ascii_case("f") => HeaderName::From,
            _ if s.eq_ignore_ascii_case("call-id") || s.eq_ignore_ascii_case("i") => HeaderName::CallId,
            _ if s.eq_ignore_ascii_case("cseq") => HeaderName::CSeq,
            _ if s.eq_ignore_ascii_case("contact") || s.eq_ignore_ascii_case("m") => HeaderName::Contact,
            _ if s.eq_ignore_ascii_case("max-forwards") => HeaderName::MaxForwards,
            _ if s.eq_ignore_ascii_case("content-length") || s.eq_ignore_ascii_case("l") => {
                HeaderName::ContentLength
            }
            _ if s.eq_ignore_ascii_case("content-type") || s.eq_ignore_ascii_case("c") => {
                HeaderName::ContentType
            }
            _ if s.eq_ignore_ascii_case("route") => HeaderName::Route,
            _ if s.eq_ignore_ascii_case("record-route") => HeaderName::RecordRoute,
            _ if s.eq_ignore_ascii_case("expires") => HeaderName::Expires,
            _ if s.eq_ignore_ascii_case("supported") || s.eq_ignore_ascii_case("k") => HeaderName::Supported,
            _ if s.eq_ignore_ascii_case("require") => HeaderName::Require,
            _ if s.eq_ignore_ascii_case("allow") => HeaderName::Allow,
            _ if s.eq_ignore_ascii_case("user-agent") => HeaderName::UserAgent,
            _ if s.eq_ignore_ascii_case("server") => HeaderName::Server,
            _ if s.eq_ignore_ascii_case("subject") || s.eq_ignore_ascii_case("s") => HeaderName::Subject,
            _ if s.eq_ignore_ascii_case("organization") => HeaderName::Organization,
            _ if s.eq_ignore_ascii_case("event") || s.eq_ignore_ascii_case("o") => HeaderName::Event,
            _ if s.eq_ignore_ascii_case("subscription-state") => HeaderName::SubscriptionState,
            _ if s.eq_ignore_ascii_case("accept") => HeaderName::Accept,
            _ => HeaderName::Other(s.to_string()),
        }
    }

    /// Dispatch to the right `ParserCategory` for this header name
    /// (spec.md §9 design note: `TypedHeader` is a tagged variant over
    /// the category types, not a per-header struct).
    fn parse_value(&self, cursor: &mut ParseCursor<'_>) -> Result<TypedHeader, ParseError> {
        Ok(match self {
            HeaderName::Via => TypedHeader::Via(Via::parse(cursor)?),
            HeaderName::To => TypedHeader::To(NameAddr::parse(cursor)?),
            HeaderName::From => TypedHeader::From(NameAddr::parse(cursor)?),
            HeaderName::Contact => TypedHeader::Contact(NameAddr::parse(cursor)?),
            HeaderName::Route => TypedHeader::Route(NameAddr::parse(cursor)?),
            HeaderName::RecordRoute => TypedHeader::RecordRoute(NameAddr::parse(cursor)?),
            HeaderName::CallId => TypedHeader::CallId(CallId::parse(cursor)?),
            HeaderName::CSeq => TypedHeader::CSeq(CSeq::parse(cursor)?),
            HeaderName::MaxForwards => TypedHeader::MaxForwards(IntegerCategory::parse(cursor)?),
            HeaderName::ContentLength => TypedHeader::ContentLength(IntegerCategory::parse(cursor)?),
            HeaderName::Expires => TypedHeader::Expires(IntegerCategory::parse(cursor)?),
            HeaderName::ContentType => TypedHeader::ContentType(Mime::parse(cursor)?),
            HeaderName::Supported => TypedHeader::Supported(Token::parse(cursor)?),
            HeaderName::Require => TypedHeader::Require(Token::parse(cursor)?),
            HeaderName::Allow => TypedHeader::Allow(Token::parse(cursor)?),
            HeaderName::Event => TypedHeader::Event(Token::parse(cursor)?),
            HeaderName::SubscriptionState => TypedHeader::SubscriptionState(Token::parse(cursor)?),
            _ => TypedHeader::Generic(StringCategory::parse(cursor)?),
        })
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parsed form of a header value, tagged by which `ParserCategory`
/// produced it (spec.md §4.2). `Generic` covers every header this stack
/// does not model structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedHeader {
    Via(Via),
    To(NameAddr),
    From(NameAddr),
    Contact(NameAddr),
    Route(NameAddr),
    RecordRoute(NameAddr),
    CallId(CallId),
    CSeq(CSeq),
    MaxForwards(IntegerCategory),
    ContentLength(IntegerCategory),
    Expires(IntegerCategory),
    ContentType(Mime),
    Supported(Token),
    Require(Token),
    Allow(Token),
    Event(Token),
    SubscriptionState(Token),
    Generic(StringCategory),
}

impl TypedHeader {
    pub fn encode(&self, out: &mut String) {
        match self {
            TypedHeader::Via(v) => v.encode(out),
            TypedHeader::To(v) | TypedHeader::From(v) | TypedHeader::Contact(v) | TypedHeader::Route(v)
            | TypedHeader::RecordRoute(v) => v.encode(out),
            TypedHeader::CallId(v) => v.encode(out),
            TypedHeader::CSeq(v) => v.encode(out),
            TypedHeader::MaxForwards(v) | TypedHeader::ContentLength(v) | TypedHeader::Expires(v) => {
                v.encode(out)
            }
            TypedHeader::ContentType(v) => v.encode(out),
            TypedHeader::Supported(v)
            | TypedHeader::Require(v)
            | TypedHeader::Allow(v)
            | TypedHeader::Event(v)
            | TypedHeader::SubscriptionState(v) => v.encode(out),
            TypedHeader::Generic(v) => v.encode(out),
        }
    }
}

/// One header line: a name, its unparsed wire text, and a lazily
/// computed typed form (spec.md §3 HeaderField). Parsing a message never
/// eagerly parses header bodies — only `typed()` does, and only the
/// first time it is called, so a header nobody inspects never pays for
/// its category's parse.
///
/// A field that has never been mutated always re-encodes from `raw`,
/// which is the only way to guarantee the byte-identical round-trip
/// invariant in the presence of non-canonical whitespace or parameter
/// ordering a peer may have sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: HeaderName,
    raw: Option<String>,
    parsed: Option<TypedHeader>,
}

impl HeaderField {
    pub fn from_raw(name: HeaderName, raw: impl Into<String>) -> Self {
        HeaderField { name, raw: Some(raw.into()), parsed: None }
    }

    pub fn from_typed(name: HeaderName, typed: TypedHeader) -> Self {
        HeaderField { name, raw: None, parsed: Some(typed) }
    }

    pub fn raw_value(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Parse (and cache) the typed form on first access.
    pub fn typed(&mut self) -> Result<&TypedHeader, ParseError> {
        if self.parsed.is_none() {
            let raw = self.raw.clone().unwrap_or_default();
            let mut cursor = ParseCursor::new(raw.as_bytes());
            let typed = self.name.parse_value(&mut cursor)?;
            self.parsed = Some(typed);
        }
        Ok(self.parsed.as_ref().expect("just populated"))
    }

    /// Replace the value with an already-typed one, discarding any raw
    /// span: after mutation there is no wire text left to preserve.
    pub fn set_typed(&mut self, typed: TypedHeader) {
        self.raw = None;
        self.parsed = Some(typed);
    }

    pub fn encode_value(&self, out: &mut String) {
        if let Some(raw) = &self.raw {
            out.push_str(raw);
        } else if let Some(typed) = &self.parsed {
            typed.encode(out);
        }
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(self.name.as_str());
        out.push_str(": ");
        self.encode_value(out);
        out.push_str("\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_compact_forms() {
        assert_eq!(HeaderName::parse(b"v"), HeaderName::Via);
        assert_eq!(HeaderName::parse(b"Content-Length"), HeaderName::ContentLength);
        assert_eq!(HeaderName::parse(b"X-Custom"), HeaderName::Other("X-Custom".to_string()));
    }

    #[test]
    fn unmutated_header_round_trips_byte_identical_even_with_odd_whitespace() {
        let mut field = HeaderField::from_raw(HeaderName::Via, "SIP/2.0/UDP  host ;branch=z9hG4bK1");
        let mut out = String::new();
        field.encode_value(&mut out);
        assert_eq!(out, "SIP/2.0/UDP  host ;branch=z9hG4bK1");
        assert!(field.typed().is_ok());
    }

    #[test]
    fn mutated_header_encodes_from_typed_form() {
        use crate::types::via::Via;
        let mut field = HeaderField::from_typed(HeaderName::Via, TypedHeader::Via(Via::new("UDP", "host")));
        let mut out = String::new();
        field.encode_value(&mut out);
        assert_eq!(out, "SIP/2.0/UDP host");
    }
}
