use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::parse_fail;
use crate::types::params::Params;

/// The scheme of a [`Uri`]. Spec.md only names `sip`/`sips` explicitly but
/// a `tel:`/custom fallback costs nothing and matches how every SIP URI
/// library in the ecosystem represents this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Sip,
    Sips,
    Tel,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Sip => "sip",
            Scheme::Sips => "sips",
            Scheme::Tel => "tel",
        }
    }

    /// Port implied by the scheme when the URI carries none ("Port 0
    /// means scheme default", spec.md §3).
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Sip | Scheme::Tel => 5060,
            Scheme::Sips => 5061,
        }
    }

    fn parse(s: &[u8]) -> Result<Scheme, ParseError> {
        match s.to_ascii_lowercase().as_slice() {
            b"sip" => Ok(Scheme::Sip),
            b"sips" => Ok(Scheme::Sips),
            b"tel" => Ok(Scheme::Tel),
            _ => Err(ParseError::new(
                file!(),
                line!(),
                format!("unsupported URI scheme: {}", String::from_utf8_lossy(s)),
                0,
            )),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SIP URI (RFC 3261 §19.1). `host` preserves whether the original text
/// was bracketed IPv6 so `encode` can reproduce it byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    pub scheme: Scheme,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    /// `true` when `host` was written as a bracketed IPv6 literal
    /// (`[2001:db8::1]`) in the source text.
    pub host_is_ipv6_literal: bool,
    /// `None` means "no port in the text" (distinct from an explicit
    /// port equal to the scheme default).
    pub port: Option<u16>,
    pub params: Params,
    pub headers: Params,
}

impl Uri {
    pub fn new(scheme: Scheme, host: impl Into<String>) -> Self {
        Uri {
            scheme,
            user: None,
            password: None,
            host: host.into(),
            host_is_ipv6_literal: false,
            port: None,
            params: Params::new(),
            headers: Params::new(),
        }
    }

    /// Effective port: the explicit port if present, otherwise the
    /// scheme default (spec.md §3: "Port 0 means scheme default").
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    pub fn transport(&self) -> Option<&str> {
        self.params.get("transport").flatten()
    }

    /// Parse a `sip:`/`sips:`/`tel:` URI. Stops at the first byte in
    /// `stop_at` that is not itself consumed as part of a URI parameter
    /// or header (e.g. `>` for a name-addr, or SP/`;`/eof for a bare
    /// addr-spec) — callers pass the set of bytes that can legally follow
    /// a URI in their context.
    pub fn parse(cursor: &mut ParseCursor<'_>, stop_at: &[u8]) -> Result<Uri, ParseError> {
        let scheme_bytes = cursor.skip_to_char(b':')?;
        let scheme = Scheme::parse(scheme_bytes)?;
        cursor.skip_char(b':')?;

        // userinfo: up to '@' but only if '@' occurs before the host
        // terminator; otherwise there is no userinfo.
        let mut stop_for_userinfo: Vec<u8> = vec![b'@'];
        stop_for_userinfo.extend_from_slice(stop_at);
        let before_at_or_stop = cursor.skip_to_one_of_or_eof(&stop_for_userinfo);
        let (user, password) = if cursor.peek_char() == Some(b'@') {
            let mut uc = ParseCursor::new(before_at_or_stop);
            let user_part = uc.skip_to_one_of_or_eof(b":");
            let password = if uc.peek_char() == Some(b':') {
                uc.skip_char(b':')?;
                Some(String::from_utf8_lossy(uc.remaining()).to_string())
            } else {
                None
            };
            cursor.skip_char(b'@')?;
            (Some(String::from_utf8_lossy(user_part).to_string()), password)
        } else {
            // No '@': `before_at_or_stop` was actually the host (or part
            // of it); rewind by re-deriving host parse below from current
            // position minus what we consumed. Simplest correct approach:
            // back the cursor up to right after the scheme colon.
            cursor.reset(cursor.position() - before_at_or_stop.len());
            (None, None)
        };

        // host
        let (host, host_is_ipv6_literal) = if cursor.peek_char() == Some(b'[') {
            cursor.skip_char(b'[')?;
            let h = cursor.skip_to_char(b']')?;
            cursor.skip_char(b']')?;
            (String::from_utf8_lossy(h).to_string(), true)
        } else {
            let mut stop_for_host: Vec<u8> = vec![b':'];
            stop_for_host.extend_from_slice(stop_at);
            let h = cursor.skip_to_one_of_or_eof(&stop_for_host);
            (String::from_utf8_lossy(h).to_string(), false)
        };
        if host.is_empty() {
            parse_fail!(cursor, "URI missing host");
        }

        let port = if cursor.peek_char() == Some(b':') {
            cursor.skip_char(b':')?;
            let digits = cursor.skip_digits()?;
            Some(
                String::from_utf8_lossy(digits)
                    .parse::<u16>()
                    .map_err(|e| ParseError::new(file!(), line!(), e.to_string(), cursor.position()))?,
            )
        } else {
            None
        };

        let params = Params::parse(cursor)?;

        let headers = if cursor.peek_char() == Some(b'?') {
            cursor.skip_char(b'?')?;
            let mut headers = Params::new();
            loop {
                let mut stop_for_hdr: Vec<u8> = vec![b'=', b'&'];
                stop_for_hdr.extend_from_slice(stop_at);
                let name = cursor.skip_to_one_of_or_eof(&stop_for_hdr);
                if name.is_empty() {
                    break;
                }
                let value = if cursor.peek_char() == Some(b'=') {
                    cursor.skip_char(b'=')?;
                    let mut stop_for_val: Vec<u8> = vec![b'&'];
                    stop_for_val.extend_from_slice(stop_at);
                    Some(String::from_utf8_lossy(cursor.skip_to_one_of_or_eof(&stop_for_val)).to_string())
                } else {
                    None
                };
                headers.set(String::from_utf8_lossy(name).to_string(), value);
                if cursor.peek_char() == Some(b'&') {
                    cursor.skip_char(b'&')?;
                    continue;
                }
                break;
            }
            headers
        } else {
            Params::new()
        };

        Ok(Uri {
            scheme,
            user,
            password,
            host,
            host_is_ipv6_literal,
            port,
            params,
            headers,
        })
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(self.scheme.as_str());
        out.push(':');
        if let Some(user) = &self.user {
            out.push_str(user);
            if let Some(pw) = &self.password {
                out.push(':');
                out.push_str(pw);
            }
            out.push('@');
        }
        if self.host_is_ipv6_literal {
            out.push('[');
            out.push_str(&self.host);
            out.push(']');
        } else {
            out.push_str(&self.host);
        }
        if let Some(port) = self.port {
            out.push(':');
            out.push_str(&port.to_string());
        }
        self.params.encode(out);
        if !self.headers.is_empty() {
            out.push('?');
            let mut first = true;
            for (k, v) in self.headers.iter() {
                if !first {
                    out.push('&');
                }
                first = false;
                out.push_str(k);
                if let Some(v) = v {
                    out.push('=');
                    out.push_str(v);
                }
            }
        }
    }
}

impl fmt::Display for Uri {
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
    fn parses_plain_sip_uri() {
        let mut c = ParseCursor::new(b"sip:alice@example.com:5060;transport=udp");
        let uri = Uri::parse(&mut c, b"").unwrap();
        assert_eq!(uri.scheme, Scheme::Sip);
        assert_eq!(uri.user.as_deref(), Some("alice"));
        assert_eq!(uri.host, "example.com");
        assert_eq!(uri.port, Some(5060));
        assert_eq!(uri.transport(), Some("udp"));
    }

    #[test]
    fn parses_uri_without_userinfo() {
        let mut c = ParseCursor::new(b"sip:example.com");
        let uri = Uri::parse(&mut c, b"").unwrap();
        assert_eq!(uri.user, None);
        assert_eq!(uri.host, "example.com");
    }

    #[test]
    fn parses_bracketed_ipv6_host() {
        let mut c = ParseCursor::new(b"sip:[2001:db8::1]:5060");
        let uri = Uri::parse(&mut c, b"").unwrap();
        assert_eq!(uri.host, "2001:db8::1");
        assert!(uri.host_is_ipv6_literal);
        assert_eq!(uri.port, Some(5060));
    }

    #[test]
    fn default_port_is_scheme_dependent() {
        let sip = Uri::new(Scheme::Sip, "example.com");
        let sips = Uri::new(Scheme::Sips, "example.com");
        assert_eq!(sip.effective_port(), 5060);
        assert_eq!(sips.effective_port(), 5061);
    }

    #[test]
    fn round_trips_through_encode() {
        let mut c = ParseCursor::new(b"sips:bob:secret@[::1]:5061;lr?subject=hi");
        let uri = Uri::parse(&mut c, b"").unwrap();
        assert_eq!(uri.to_string(), "sips:bob:secret@[::1]:5061;lr?subject=hi");
    }
}
