use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::parse_fail;
use crate::types::params::Params;

/// A bare-integer header value with an optional parenthesised comment and
/// trailing parameters (spec.md §4.2 IntegerCategory), e.g.
/// `Max-Forwards: 70`, `Expires: 3600 (one hour)`, `Content-Length: 0`.
///
/// Grammar: `1*DIGIT [LWS "(" comment ")"] *(SEMI generic-param)`. An
/// unterminated comment, or garbage between the closing `)` and the first
/// `;`, is a parse error (spec.md §4.2 edge cases).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerCategory {
    pub value: u32,
    pub comment: Option<String>,
    pub params: Params,
}

impl IntegerCategory {
    pub fn new(value: u32) -> Self {
        IntegerCategory { value, comment: None, params: Params::new() }
    }

    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<IntegerCategory, ParseError> {
        cursor.skip_whitespace();
        let digits = cursor.skip_digits()?;
        let value = String::from_utf8_lossy(digits)
            .parse::<u32>()
            .map_err(|e| ParseError::new(file!(), line!(), e.to_string(), cursor.position()))?;

        cursor.skip_whitespace();
        let comment = if cursor.peek_char() == Some(b'(') {
            cursor.skip_char(b'(')?;
            let c = cursor.skip_to_end_comment()?;
            cursor.skip_whitespace();
            Some(String::from_utf8_lossy(c).to_string())
        } else {
            None
        };

        // After an optional comment, only whitespace or a ';' may follow
        // before the param list; anything else is garbage (spec.md §4.2).
        if !cursor.eof() && cursor.peek_char() != Some(b';') {
            parse_fail!(cursor, "unexpected trailing data after integer value");
        }

        let params = Params::parse(cursor)?;

        Ok(IntegerCategory { value, comment, params })
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(&self.value.to_string());
        if let Some(c) = &self.comment {
            out.push_str(" (");
            out.push_str(c);
            out.push(')');
        }
        self.params.encode(out);
    }
}

impl fmt::Display for IntegerCategory {
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
    fn parses_bare_integer() {
        let mut c = ParseCursor::new(b"70");
        let v = IntegerCategory::parse(&mut c).unwrap();
        assert_eq!(v.value, 70);
        assert_eq!(v.comment, None);
    }

    #[test]
    fn parses_integer_with_comment_and_params() {
        let mut c = ParseCursor::new(b"3600 (one hour);refresher=uac");
        let v = IntegerCategory::parse(&mut c).unwrap();
        assert_eq!(v.value, 3600);
        assert_eq!(v.comment.as_deref(), Some("one hour"));
        assert_eq!(v.params.get("refresher"), Some(Some("uac")));
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let mut c = ParseCursor::new(b"3600 (one hour");
        assert!(IntegerCategory::parse(&mut c).is_err());
    }

    #[test]
    fn garbage_after_comment_is_an_error() {
        let mut c = ParseCursor::new(b"3600 (one hour) garbage");
        assert!(IntegerCategory::parse(&mut c).is_err());
    }

    #[test]
    fn round_trips_with_comment() {
        let mut c = ParseCursor::new(b"3600 (one hour);refresher=uac");
        let v = IntegerCategory::parse(&mut c).unwrap();
        assert_eq!(v.to_string(), "3600 (one hour);refresher=uac");
    }
}
