use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::types::params::Params;

/// A generic `token;param=value;...` category (spec.md §4.2 Token): a
/// bare token optionally followed by parameters. Used for headers like
/// `Supported`/`Require`/`Subscription-State` whose value set is open
/// and whose main structure is "word plus params".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub params: Params,
}

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Token { value: value.into(), params: Params::new() }
    }

    /// skip WS -> capture up to WS-or-';' -> parse `;param=value` pairs
    /// (spec.md §4.2 Token semantics).
    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<Token, ParseError> {
        cursor.skip_whitespace();
        let value = cursor.skip_to_one_of_or_eof(b";, \t\r\n");
        let params = Params::parse(cursor)?;
        Ok(Token { value: String::from_utf8_lossy(value).to_string(), params })
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(&self.value);
        self.params.encode(out);
    }
}

impl fmt::Display for Token {
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
    fn parses_token_with_params() {
        let mut c = ParseCursor::new(b"active;expires=666");
        let t = Token::parse(&mut c).unwrap();
        assert_eq!(t.value, "active");
        assert_eq!(t.params.get("expires"), Some(Some("666")));
    }
}
