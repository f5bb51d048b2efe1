use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::parse_fail;
use crate::types::method::Method;
use crate::types::uri::Uri;

/// `Method SP Request-URI SP SIP-Version` (RFC 3261 §7.1, spec.md §4.2
/// RequestLine). An unrecognised method parses as `Method::Unknown`
/// carrying its original-case text rather than failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub uri: Uri,
    pub sip_version: String,
}

impl RequestLine {
    pub fn new(method: Method, uri: Uri) -> Self {
        RequestLine { method, uri, sip_version: "SIP/2.0".to_string() }
    }

    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<RequestLine, ParseError> {
        let method_token = cursor.skip_non_whitespace();
        if method_token.is_empty() {
            parse_fail!(cursor, "request line missing method");
        }
        let method = Method::parse(method_token);
        cursor.skip_whitespace();

        let uri = Uri::parse(cursor, b" \t")?;
        cursor.skip_whitespace();

        let version = cursor.skip_to_one_of_or_eof(b"\r\n");
        if version.is_empty() {
            parse_fail!(cursor, "request line missing SIP-Version");
        }

        Ok(RequestLine { method, uri, sip_version: String::from_utf8_lossy(version).to_string() })
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(self.method.as_str());
        out.push(' ');
        self.uri.encode(out);
        out.push(' ');
        out.push_str(&self.sip_version);
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        self.encode(&mut s);
        f.write_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::uri::Scheme;

    #[test]
    fn parses_invite_request_line() {
        let mut c = ParseCursor::new(b"INVITE sip:bob@example.com SIP/2.0");
        let rl = RequestLine::parse(&mut c).unwrap();
        assert_eq!(rl.method, Method::Invite);
        assert_eq!(rl.uri.scheme, Scheme::Sip);
        assert_eq!(rl.sip_version, "SIP/2.0");
    }

    #[test]
    fn unknown_method_round_trips() {
        let mut c = ParseCursor::new(b"WOBBLE sip:bob@example.com SIP/2.0");
        let rl = RequestLine::parse(&mut c).unwrap();
        assert_eq!(rl.method, Method::Unknown("WOBBLE".to_string()));
        assert_eq!(rl.to_string(), "WOBBLE sip:bob@example.com SIP/2.0");
    }
}
