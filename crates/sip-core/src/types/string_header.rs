use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;

/// A generic free-text header value (spec.md §4.2 StringCategory): the
/// remainder of the line, taken verbatim. Used for headers whose grammar
/// this stack does not model structurally — `Subject`, `User-Agent`,
/// `Server`, `Organization`, `Warning` (as free text; see spec.md §9 Open
/// Questions for why `Warning` is not split into code/host/text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringCategory(pub String);

impl StringCategory {
    pub fn new(value: impl Into<String>) -> Self {
        StringCategory(value.into())
    }

    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<StringCategory, ParseError> {
        cursor.skip_whitespace();
        let rest = cursor.remaining();
        // Consume everything; a StringCategory owns the whole field body.
        cursor.reset(cursor.position() + rest.len());
        Ok(StringCategory(String::from_utf8_lossy(rest).trim_end().to_string()))
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(&self.0);
    }
}

impl fmt::Display for StringCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_entire_remainder() {
        let mut c = ParseCursor::new(b"  Anonymous UA/1.0 ");
        let s = StringCategory::parse(&mut c).unwrap();
        assert_eq!(s.0, "Anonymous UA/1.0");
    }
}
