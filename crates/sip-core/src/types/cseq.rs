use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::parse_fail;
use crate::types::method::Method;

/// `CSeq: 1 INVITE` (RFC 3261 §20.16). Sequence wraps implicitly on
/// overflow (spec.md §3); dialogs, not this type, reject non-monotonic
/// in-dialog sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSeq {
    pub sequence: u32,
    pub method: Method,
}

impl CSeq {
    pub fn new(sequence: u32, method: Method) -> Self {
        CSeq { sequence, method }
    }

    /// Requires digits, one or more WS, then a method token. Fails if
    /// either half is missing (spec.md §4.2 / S1).
    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<CSeq, ParseError> {
        cursor.skip_whitespace();
        let digits = cursor.skip_digits()?;
        let before_ws = cursor.position();
        cursor.skip_whitespace();
        if cursor.position() == before_ws {
            parse_fail!(cursor, "CSeq requires whitespace between sequence and method");
        }
        let method_token = cursor.skip_non_whitespace();
        if method_token.is_empty() {
            parse_fail!(cursor, "CSeq missing method");
        }
        let sequence = String::from_utf8_lossy(digits)
            .parse::<u32>()
            .map_err(|e| ParseError::new(file!(), line!(), e.to_string(), cursor.position()))?;
        Ok(CSeq { sequence, method: Method::parse(method_token) })
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(&self.sequence.to_string());
        out.push(' ');
        out.push_str(self.method.as_str());
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        self.encode(&mut s);
        f.write_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_basic_cseq() {
        let mut c = ParseCursor::new(b"15 ACK");
        let cseq = CSeq::parse(&mut c).unwrap();
        assert_eq!(cseq, CSeq::new(15, Method::Ack));
    }

    #[test]
    fn s1_missing_sequence_is_an_error() {
        let mut c = ParseCursor::new(b"ACK");
        assert!(CSeq::parse(&mut c).is_err());
    }

    #[test]
    fn s1_unknown_method_round_trips() {
        let mut c = ParseCursor::new(b"1323333 InviTe");
        let cseq = CSeq::parse(&mut c).unwrap();
        assert_eq!(cseq.sequence, 1323333);
        assert_eq!(cseq.method, Method::Unknown("InviTe".to_string()));
        assert_eq!(cseq.to_string(), "1323333 InviTe");
    }
}
