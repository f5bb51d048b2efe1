use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::parse_fail;
use crate::types::params::Params;

/// A MIME media type (`type/subtype;params`), used by `Content-Type` and
/// `Accept`. Comparison is case-insensitive per spec.md §4.2.
#[derive(Debug, Clone)]
pub struct Mime {
    pub media_type: String,
    pub subtype: String,
    pub params: Params,
}

impl Mime {
    pub fn new(media_type: impl Into<String>, subtype: impl Into<String>) -> Self {
        Mime { media_type: media_type.into(), subtype: subtype.into(), params: Params::new() }
    }

    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<Mime, ParseError> {
        cursor.skip_whitespace();
        let media_type = cursor.skip_to_char(b'/')?;
        cursor.skip_char(b'/')?;
        let subtype = cursor.skip_to_one_of_or_eof(b";, \t\r\n");
        if media_type.is_empty() || subtype.is_empty() {
            parse_fail!(cursor, "MIME type missing type or subtype");
        }
        let params = Params::parse(cursor)?;
        Ok(Mime {
            media_type: String::from_utf8_lossy(media_type).to_string(),
            subtype: String::from_utf8_lossy(subtype).to_string(),
            params,
        })
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(&self.media_type);
        out.push('/');
        out.push_str(&self.subtype);
        self.params.encode(out);
    }
}

impl PartialEq for Mime {
    fn eq(&self, other: &Self) -> bool {
        self.media_type.eq_ignore_ascii_case(&other.media_type)
            && self.subtype.eq_ignore_ascii_case(&other.subtype)
    }
}
impl Eq for Mime {}

impl fmt::Display for Mime {
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
    fn parses_type_and_subtype() {
        let mut c = ParseCursor::new(b"text/plain");
        let m = Mime::parse(&mut c).unwrap();
        assert_eq!(m.media_type, "text");
        assert_eq!(m.subtype, "plain");
    }

    #[test]
    fn compares_case_insensitively() {
        let a = Mime::new("Text", "Plain");
        let b = Mime::new("text", "plain");
        assert_eq!(a, b);
    }

    #[test]
    fn missing_slash_is_an_error() {
        let mut c = ParseCursor::new(b"textplain");
        assert!(Mime::parse(&mut c).is_err());
    }
}
