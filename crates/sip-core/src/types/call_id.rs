use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::parse_fail;

/// `Call-ID` (RFC 3261 §20.8): an opaque token, conventionally
/// `local-id@host` but never interpreted as anything but an equality key.
///
/// The original source left `CallId::parse` as an `assert(0)` stub (see
/// spec.md §9 "Global `assert(0)` stubs"); this is the real implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallId(pub String);

impl CallId {
    pub fn new(value: impl Into<String>) -> Self {
        CallId(value.into())
    }

    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<CallId, ParseError> {
        cursor.skip_whitespace();
        let value = cursor.skip_to_one_of_or_eof(b" \t\r\n;");
        if value.is_empty() {
            parse_fail!(cursor, "Call-ID is empty");
        }
        Ok(CallId(String::from_utf8_lossy(value).to_string()))
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(&self.0);
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_id_value() {
        let mut c = ParseCursor::new(b"f81d4fae-7dec-11d0-a765-00a0c91e6bf6@example.com");
        let id = CallId::parse(&mut c).unwrap();
        assert_eq!(id.0, "f81d4fae-7dec-11d0-a765-00a0c91e6bf6@example.com");
    }

    #[test]
    fn empty_call_id_is_an_error() {
        let mut c = ParseCursor::new(b"");
        assert!(CallId::parse(&mut c).is_err());
    }
}
