use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::types::params::Params;
use crate::types::uri::Uri;

/// `[display-name] (name-addr / addr-spec) *(SEMI generic-param)`
/// (RFC 3261 §20.10/20.20/20.39 — From/To/Contact all share this shape).
///
/// Spec.md §4.2: three accepted shapes — `"display" <uri>;params`,
/// `<uri>;params`, `uri;params`. The quoted-string display name and the
/// angle-bracket form are syntactic variants that must round-trip
/// (spec.md §3): whether params sat *inside* `<...>` (belonging to the
/// URI) or *after* `>` (belonging to the header) must be preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAddr {
    pub display_name: Option<String>,
    /// `true` if the source used `<...>` around the URI, even with no
    /// display name and no header params — needed to re-encode a bare
    /// `<sip:...>` distinctly from a bare `sip:...` addr-spec.
    pub angle_brackets: bool,
    pub uri: Uri,
    pub params: Params,
}

impl NameAddr {
    pub fn new(uri: Uri) -> Self {
        NameAddr { display_name: None, angle_brackets: false, uri, params: Params::new() }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self.angle_brackets = true;
        self
    }

    pub fn tag(&self) -> Option<&str> {
        self.params.get("tag").flatten()
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.params.set("tag", Some(tag.into()));
    }

    /// Parser tries quoted display name first, then looks for `<`, else
    /// treats the entire field as an addr-spec (spec.md §4.2 NameAddr).
    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<NameAddr, ParseError> {
        cursor.skip_whitespace();

        let display_name = if cursor.peek_char() == Some(b'"') {
            cursor.skip_char(b'"')?;
            let name = cursor.skip_to_end_quote()?;
            cursor.skip_whitespace();
            Some(String::from_utf8_lossy(name).to_string())
        } else if cursor.peek_char() != Some(b'<') {
            // Could be an unquoted display-name token preceding '<', or
            // there may be no display name at all (bare addr-spec). Peek
            // ahead for '<' before the next header-terminating boundary.
            let save = cursor.position();
            let token = trim(cursor.skip_to_one_of_or_eof(b"<\r\n"));
            if cursor.peek_char() == Some(b'<') && !token.is_empty() {
                Some(String::from_utf8_lossy(token).to_string())
            } else {
                cursor.reset(save);
                None
            }
        } else {
            None
        };

        let (uri, angle_brackets) = if cursor.peek_char() == Some(b'<') {
            cursor.skip_char(b'<')?;
            let uri = Uri::parse(cursor, b">")?;
            cursor.skip_char(b'>')?;
            (uri, true)
        } else {
            // A bare addr-spec's params are ambiguous with header params;
            // RFC 3261 treats them as URI params when no angle brackets
            // are present, since there is no syntactic separator.
            let uri = Uri::parse(cursor, b" \t\r\n;")?;
            (uri, false)
        };

        let header_params = Params::parse(cursor)?;

        Ok(NameAddr { display_name, angle_brackets, uri, params: header_params })
    }

    pub fn encode(&self, out: &mut String) {
        if let Some(name) = &self.display_name {
            out.push('"');
            out.push_str(&name.replace('\\', "\\\\").replace('"', "\\\""));
            out.push_str("\" ");
        }
        if self.angle_brackets || self.display_name.is_some() {
            out.push('<');
            self.uri.encode(out);
            out.push('>');
        } else {
            self.uri.encode(out);
        }
        self.params.encode(out);
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        self.encode(&mut s);
        f.write_str(&s)
    }
}

fn trim(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(s.len());
    let end = s.iter().rposition(|b| !b.is_ascii_whitespace()).map(|i| i + 1).unwrap_or(start);
    &s[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::uri::Scheme;

    #[test]
    fn parses_quoted_display_name_form() {
        let mut c = ParseCursor::new(b"\"Alice\" <sip:alice@example.com>;tag=abc");
        let na = NameAddr::parse(&mut c).unwrap();
        assert_eq!(na.display_name.as_deref(), Some("Alice"));
        assert_eq!(na.uri.scheme, Scheme::Sip);
        assert_eq!(na.tag(), Some("abc"));
    }

    #[test]
    fn parses_bare_angle_bracket_form() {
        let mut c = ParseCursor::new(b"<sip:bob@example.com>");
        let na = NameAddr::parse(&mut c).unwrap();
        assert_eq!(na.display_name, None);
        assert!(na.angle_brackets);
        assert_eq!(na.uri.host, "example.com");
    }

    #[test]
    fn parses_bare_addr_spec_form() {
        let mut c = ParseCursor::new(b"sip:carol@example.com");
        let na = NameAddr::parse(&mut c).unwrap();
        assert_eq!(na.display_name, None);
        assert!(!na.angle_brackets);
    }

    #[test]
    fn round_trips_quoted_form() {
        let mut c = ParseCursor::new(b"\"Alice\" <sip:alice@example.com>;tag=abc");
        let na = NameAddr::parse(&mut c).unwrap();
        assert_eq!(na.to_string(), "\"Alice\" <sip:alice@example.com>;tag=abc");
    }
}
