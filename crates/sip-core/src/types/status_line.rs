use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::parse_fail;
use crate::types::status::StatusCode;

/// `SIP-Version SP Status-Code SP Reason-Phrase` (RFC 3261 §7.2, spec.md
/// §4.2 StatusLine). The reason phrase runs to end-of-line and is kept
/// verbatim even when it does not match the code's default reason text.
///
/// The original source left `StatusLine::parse` as an `assert(0)` stub
/// (spec.md §9 "Global `assert(0)` stubs"); this is the real implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub sip_version: String,
    pub status_code: StatusCode,
    pub reason_phrase: String,
}

impl StatusLine {
    pub fn new(status_code: StatusCode) -> Self {
        let reason_phrase = status_code.default_reason().to_string();
        StatusLine { sip_version: "SIP/2.0".to_string(), status_code, reason_phrase }
    }

    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<StatusLine, ParseError> {
        let version = cursor.skip_non_whitespace();
        if version.is_empty() {
            parse_fail!(cursor, "status line missing SIP-Version");
        }
        cursor.skip_whitespace();

        let digits = cursor.skip_digits()?;
        if digits.len() != 3 {
            parse_fail!(cursor, "status code must be exactly 3 digits");
        }
        let code = String::from_utf8_lossy(digits)
            .parse::<u16>()
            .map_err(|e| ParseError::new(file!(), line!(), e.to_string(), cursor.position()))?;

        cursor.skip_whitespace();
        let reason = cursor.skip_to_one_of_or_eof(b"\r\n");

        Ok(StatusLine {
            sip_version: String::from_utf8_lossy(version).to_string(),
            status_code: StatusCode(code),
            reason_phrase: String::from_utf8_lossy(reason).to_string(),
        })
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(&self.sip_version);
        out.push(' ');
        out.push_str(&self.status_code.0.to_string());
        out.push(' ');
        out.push_str(&self.reason_phrase);
    }
}

impl fmt::Display for StatusLine {
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
    fn parses_ringing_status_line() {
        let mut c = ParseCursor::new(b"SIP/2.0 180 Ringing");
        let sl = StatusLine::parse(&mut c).unwrap();
        assert_eq!(sl.status_code, StatusCode(180));
        assert_eq!(sl.reason_phrase, "Ringing");
        assert!(sl.status_code.is_provisional());
    }

    #[test]
    fn rejects_non_3_digit_code() {
        let mut c = ParseCursor::new(b"SIP/2.0 42 Nope");
        assert!(StatusLine::parse(&mut c).is_err());
    }

    #[test]
    fn preserves_nonstandard_reason_phrase_on_round_trip() {
        let mut c = ParseCursor::new(b"SIP/2.0 200 Totally OK");
        let sl = StatusLine::parse(&mut c).unwrap();
        assert_eq!(sl.to_string(), "SIP/2.0 200 Totally OK");
    }
}
