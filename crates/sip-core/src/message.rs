use std::net::SocketAddr;

use crate::cursor::ParseCursor;
use crate::error::{Error, ParseError, Result};
use crate::types::header::{HeaderField, HeaderName, TypedHeader};
use crate::types::mime::Mime;
use crate::types::request_line::RequestLine;
use crate::types::status_line::StatusLine;

/// A request or response start line (spec.md §4.2 RequestLine/StatusLine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request(RequestLine),
    Response(StatusLine),
}

/// Unfold RFC 3261 `LWS` header continuations (a CRLF immediately
/// followed by SP/HT is not a line break, it is whitespace) into a
/// single physical line per header, so [`ParseCursor`] never has to know
/// about folding. Folding is the one piece of message structure handled
/// before a cursor exists at all (see cursor.rs's doc comment).
fn unfold(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\r' && raw.get(i + 1) == Some(&b'\n') && matches!(raw.get(i + 2), Some(b' ') | Some(b'\t'))
        {
            out.push(b' ');
            i += 2;
            while matches!(raw.get(i), Some(b' ') | Some(b'\t')) {
                i += 1;
            }
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

/// A complete SIP message: a start line, an ordered list of header
/// fields (order preserved so repeatable headers like `Via`/`Route`
/// retain the peer's wire order), and a body (spec.md §4.3 SipMessage).
///
/// `received_from` is the minimal transport context this crate carries
/// on its own; richer context (which listener accepted the connection,
/// TLS peer identity) is layered on by `rvoip-sip-transport`, which
/// depends on this crate rather than the reverse.
#[derive(Debug, Clone)]
pub struct SipMessage {
    pub start_line: StartLine,
    headers: Vec<HeaderField>,
    pub body: Vec<u8>,
    pub received_from: Option<SocketAddr>,
}

/// The canonical header order this stack emits on encode, regardless of
/// the order headers were set in (spec.md §4.3): routing headers first,
/// then the dialog-identifying headers, then everything else
/// alphabetically, with `Content-Length` always last so a streaming
/// writer can compute it from everything already written.
const CANONICAL_ORDER: &[HeaderName] = &[
    HeaderName::Via,
    HeaderName::RecordRoute,
    HeaderName::Route,
    HeaderName::From,
    HeaderName::To,
    HeaderName::CallId,
    HeaderName::CSeq,
    HeaderName::Contact,
    HeaderName::MaxForwards,
];

impl SipMessage {
    pub fn new_request(request_line: RequestLine) -> Self {
        SipMessage {
            start_line: StartLine::Request(request_line),
            headers: Vec::new(),
            body: Vec::new(),
            received_from: None,
        }
    }

    pub fn new_response(status_line: StatusLine) -> Self {
        SipMessage {
            start_line: StartLine::Response(status_line),
            headers: Vec::new(),
            body: Vec::new(),
            received_from: None,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start_line, StartLine::Request(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self.start_line, StartLine::Response(_))
    }

    pub fn request_line(&self) -> Option<&RequestLine> {
        match &self.start_line {
            StartLine::Request(rl) => Some(rl),
            StartLine::Response(_) => None,
        }
    }

    pub fn status_line(&self) -> Option<&StatusLine> {
        match &self.start_line {
            StartLine::Response(sl) => Some(sl),
            StartLine::Request(_) => None,
        }
    }

    /// First header field matching `name`, if any. Headers that may
    /// legally repeat (`Via`, `Route`, `Record-Route`) should be read
    /// with [`Self::headers_named`] instead.
    pub fn header(&self, name: &HeaderName) -> Option<&HeaderField> {
        self.headers.iter().find(|h| &h.name == name)
    }

    pub fn header_mut(&mut self, name: &HeaderName) -> Option<&mut HeaderField> {
        self.headers.iter_mut().find(|h| &h.name == name)
    }

    pub fn headers_named<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a HeaderField> {
        self.headers.iter().filter(move |h| &h.name == name)
    }

    pub fn exists(&self, name: &HeaderName) -> bool {
        self.header(name).is_some()
    }

    pub fn all_headers(&self) -> &[HeaderField] {
        &self.headers
    }

    pub fn push_header(&mut self, field: HeaderField) {
        self.headers.push(field);
    }

    pub fn remove_headers(&mut self, name: &HeaderName) {
        self.headers.retain(|h| &h.name != name);
    }

    /// Replace the body and set `Content-Type`/`Content-Length` to
    /// match, discarding any previous body headers (spec.md §4.3
    /// `setContents`).
    pub fn set_contents(&mut self, mime: Mime, body: Vec<u8>) {
        self.remove_headers(&HeaderName::ContentType);
        self.remove_headers(&HeaderName::ContentLength);
        self.push_header(HeaderField::from_typed(HeaderName::ContentType, TypedHeader::ContentType(mime)));
        self.push_header(HeaderField::from_typed(
            HeaderName::ContentLength,
            TypedHeader::ContentLength(crate::types::integer::IntegerCategory::new(body.len() as u32)),
        ));
        self.body = body;
    }

    /// Parse a complete message out of `raw`, rejecting a short body
    /// against its declared `Content-Length` (spec.md §4.3). Equivalent
    /// to `parse_with(raw, false)`; transports that honor
    /// `StackConfig::permissive_parse` call [`Self::parse_with`] directly.
    pub fn parse(raw: &[u8]) -> Result<SipMessage> {
        Self::parse_with(raw, false)
    }

    /// As [`Self::parse`], but when `permissive` is set a declared
    /// `Content-Length` longer than the bytes actually available is not
    /// a parse failure: the message is still delivered, with its body
    /// truncated to whatever arrived (spec.md §4.3 "Parse failures ...
    /// the message MAY still be delivered to the TU if a configured
    /// permissive flag is set, otherwise discarded"). A start line or
    /// header block that cannot be located at all is always an error —
    /// there is no message left to deliver leniently.
    pub fn parse_with(raw: &[u8], permissive: bool) -> Result<SipMessage> {
        let header_end = find_header_block_end(raw).ok_or_else(|| {
            tracing::debug!(len = raw.len(), "no blank line terminating headers");
            Error::Parse(ParseError::new(file!(), line!(), "no blank line terminating headers", raw.len()))
        })?;
        let header_block = unfold(&raw[..header_end]);
        let mut lines = header_block.split(|&b| b == b'\n').map(|l| {
            if l.last() == Some(&b'\r') {
                &l[..l.len() - 1]
            } else {
                l
            }
        });

        let first_line = lines.next().unwrap_or(b"");
        let mut first_cursor = ParseCursor::new(first_line);
        let start_line = if first_line.starts_with(b"SIP/") {
            StartLine::Response(StatusLine::parse(&mut first_cursor)?)
        } else {
            StartLine::Request(RequestLine::parse(&mut first_cursor)?)
        };

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let mut c = ParseCursor::new(line);
            let name_bytes = c.skip_to_char(b':')?;
            c.skip_char(b':')?;
            c.skip_whitespace();
            let name = HeaderName::parse(name_bytes);
            let value = String::from_utf8_lossy(c.remaining()).trim_end().to_string();
            headers.push(HeaderField::from_raw(name, value));
        }

        // Headers the RFC permits only once are canonicalised to list-of-one
        // here, on parse, rather than left for every caller of `header()` or
        // `encode()` to notice a second one straggling behind the first.
        let mut seen_singleton: Vec<HeaderName> = Vec::new();
        headers.retain(|h| {
            if !h.name.is_singleton() {
                return true;
            }
            if seen_singleton.contains(&h.name) {
                tracing::warn!(header = h.name.as_str(), "duplicate singleton header, keeping first occurrence");
                false
            } else {
                seen_singleton.push(h.name.clone());
                true
            }
        });

        let content_length = headers
            .iter()
            .find(|h| h.name == HeaderName::ContentLength)
            .and_then(|h| h.raw_value())
            .map(|v| v.trim().parse::<usize>())
            .transpose()
            .map_err(|e: std::num::ParseIntError| Error::Parse(ParseError::new(file!(), line!(), e.to_string(), header_end)))?
            .unwrap_or(0);

        let body_start = header_end;
        let available = raw.len().saturating_sub(body_start);
        let body = if available < content_length {
            if !permissive {
                return Err(Error::ContentLengthMismatch { expected: content_length, actual: available });
            }
            tracing::warn!(expected = content_length, actual = available, "permissive parse: delivering short body as-is");
            raw[body_start..].to_vec()
        } else {
            raw[body_start..body_start + content_length].to_vec()
        };

        Ok(SipMessage { start_line, headers, body, received_from: None })
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        match &self.start_line {
            StartLine::Request(rl) => rl.encode(&mut out),
            StartLine::Response(sl) => sl.encode(&mut out),
        }
        out.push_str("\r\n");

        let mut ordered: Vec<&HeaderField> = Vec::with_capacity(self.headers.len());
        for name in CANONICAL_ORDER {
            ordered.extend(self.headers.iter().filter(|h| &h.name == name));
        }
        let mut rest: Vec<&HeaderField> = self
            .headers
            .iter()
            .filter(|h| !CANONICAL_ORDER.contains(&h.name) && h.name != HeaderName::ContentLength)
            .collect();
        rest.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        ordered.extend(rest);
        ordered.extend(self.headers.iter().filter(|h| h.name == HeaderName::ContentLength));

        for field in ordered {
            field.encode(&mut out);
        }
        out.push_str("\r\n");
        out
    }

    /// Encode the full wire form: headers, blank line, then the raw body
    /// bytes appended (the body is not necessarily valid UTF-8).
    pub fn encode_bytes(&self) -> Vec<u8> {
        let mut out = self.encode().into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

fn find_header_block_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4)
        .or_else(|| raw.windows(2).position(|w| w == b"\n\n").map(|i| i + 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVITE: &[u8] = b"INVITE sip:bob@example.com SIP/2.0\r\n\
Via: SIP/2.0/UDP pc33.example.com;branch=z9hG4bK776asdhds\r\n\
Max-Forwards: 70\r\n\
To: Bob <sip:bob@example.com>\r\n\
From: Alice <sip:alice@example.com>;tag=1928301774\r\n\
Call-ID: a84b4c76e66710@pc33.example.com\r\n\
CSeq: 314159 INVITE\r\n\
Contact: <sip:alice@pc33.example.com>\r\n\
Content-Length: 0\r\n\r\n";

    #[test]
    fn parses_a_basic_invite() {
        let msg = SipMessage::parse(INVITE).unwrap();
        assert!(msg.is_request());
        assert_eq!(msg.request_line().unwrap().method, crate::types::method::Method::Invite);
        assert!(msg.exists(&HeaderName::Via));
        assert_eq!(msg.body.len(), 0);
    }

    #[test]
    fn content_length_mismatch_is_an_error() {
        let bad = b"INVITE sip:bob@example.com SIP/2.0\r\nContent-Length: 5\r\n\r\n";
        assert!(matches!(SipMessage::parse(bad), Err(Error::ContentLengthMismatch { .. })));
    }

    #[test]
    fn permissive_parse_delivers_a_short_body_instead_of_failing() {
        let bad = b"INVITE sip:bob@example.com SIP/2.0\r\nContent-Length: 5\r\n\r\nhi";
        let msg = SipMessage::parse_with(bad, true).unwrap();
        assert_eq!(msg.body, b"hi");
    }

    #[test]
    fn unfolds_continuation_lines_before_parsing() {
        let msg = b"SIP/2.0 200 OK\r\nSubject: long\r\n line\r\nContent-Length: 0\r\n\r\n";
        let parsed = SipMessage::parse(msg).unwrap();
        let subj = parsed.header(&HeaderName::Subject).unwrap();
        assert_eq!(subj.raw_value(), Some("long line"));
    }

    #[test]
    fn encode_places_content_length_last_and_via_first() {
        let msg = SipMessage::parse(INVITE).unwrap();
        let encoded = msg.encode();
        let via_pos = encoded.find("Via:").unwrap();
        let cl_pos = encoded.find("Content-Length:").unwrap();
        assert!(via_pos < cl_pos);
    }
}
