use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;

/// An ordered `Symbol -> Value` map, used by [`crate::types::uri::Uri`]
/// (uri-params), [`crate::types::name_addr::NameAddr`] (header params) and
/// the generic [`crate::types::token::Token`] category. Spec.md §3
/// requires params be an *ordered* map so re-encoding preserves the wire
/// order the peer sent; a `HashMap` would not do that.
///
/// Parameter names compare case-insensitively (RFC 3261 §7.3.1); the
/// original-case spelling is kept for re-encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, Option<String>)>);

impl Params {
    pub fn new() -> Self {
        Params(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or overwrite a parameter, preserving its original position
    /// if it already existed, appending otherwise.
    pub fn set(&mut self, name: impl Into<String>, value: Option<impl Into<String>>) {
        let name = name.into();
        let value = value.map(Into::into);
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            entry.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Option<String>> {
        if let Some(idx) = self.0.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(self.0.remove(idx).1)
        } else {
            None
        }
    }

    /// Parse a run of `;name` or `;name=value` pairs. Values may be a
    /// quoted-string or a bare token; stops as soon as the cursor is not
    /// positioned on `;`.
    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<Params, ParseError> {
        let mut params = Params::new();
        loop {
            cursor.skip_whitespace();
            if cursor.peek_char() != Some(b';') {
                break;
            }
            cursor.skip_char(b';')?;
            cursor.skip_whitespace();
            let name_bytes = cursor.skip_to_one_of_or_eof(b"=;, \t\r\n");
            let name = String::from_utf8_lossy(name_bytes).to_string();
            if name.is_empty() {
                break;
            }
            if cursor.peek_char() == Some(b'=') {
                cursor.skip_char(b'=')?;
                let value = if cursor.peek_char() == Some(b'"') {
                    cursor.skip_char(b'"')?;
                    String::from_utf8_lossy(cursor.skip_to_end_quote()?).to_string()
                } else {
                    String::from_utf8_lossy(cursor.skip_to_one_of_or_eof(b";, \t\r\n")).to_string()
                };
                params.set(name, Some(value));
            } else {
                params.set(name, None::<String>);
            }
        }
        Ok(params)
    }

    pub fn encode(&self, out: &mut String) {
        for (name, value) in &self.0 {
            out.push(';');
            out.push_str(name);
            if let Some(v) = value {
                out.push('=');
                if needs_quoting(v) {
                    out.push('"');
                    out.push_str(&v.replace('\\', "\\\\").replace('"', "\\\""));
                    out.push('"');
                } else {
                    out.push_str(v);
                }
            }
        }
    }
}

fn needs_quoting(v: &str) -> bool {
    !v.is_empty()
        && !v
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-.!%*_+`'~".contains(&b))
}

impl fmt::Display for Params {
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
    fn parses_mixed_value_and_flag_params() {
        let mut c = ParseCursor::new(b";transport=udp;lr;ttl=\"5\" rest");
        let params = Params::parse(&mut c).unwrap();
        assert_eq!(params.get("transport"), Some(Some("udp")));
        assert_eq!(params.get("lr"), Some(None));
        assert_eq!(params.get("ttl"), Some(Some("5")));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut p = Params::new();
        p.set("Branch", Some("z9hG4bK-x"));
        assert_eq!(p.get("branch"), Some(Some("z9hG4bK-x")));
    }

    #[test]
    fn preserves_insertion_order_on_encode() {
        let mut p = Params::new();
        p.set("b", Some("2"));
        p.set("a", Some("1"));
        assert_eq!(p.to_string(), ";b=2;a=1");
    }
}
