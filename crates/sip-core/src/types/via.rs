use std::fmt;
use crate::cursor::ParseCursor;
use crate::error::ParseError;
use crate::parse_fail;
use crate::types::params::Params;

/// `Via: SIP/2.0/UDP host:port;branch=...` (RFC 3261 §20.42, spec.md §4.2).
/// `branch` is the transaction key half (spec.md §3); it lives in
/// `params` like any other parameter, with an accessor for convenience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via {
    pub protocol_name: String,
    pub protocol_version: String,
    pub transport: String,
    pub sent_host: String,
    pub sent_host_is_ipv6_literal: bool,
    pub sent_port: Option<u16>,
    pub params: Params,
}

impl Via {
    pub fn new(transport: impl Into<String>, sent_host: impl Into<String>) -> Self {
        Via {
            protocol_name: "SIP".to_string(),
            protocol_version: "2.0".to_string(),
            transport: transport.into(),
            sent_host: sent_host.into(),
            sent_host_is_ipv6_literal: false,
            sent_port: None,
            params: Params::new(),
        }
    }

    pub fn branch(&self) -> Option<&str> {
        self.params.get("branch").flatten()
    }

    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.params.set("branch", Some(branch.into()));
    }

    /// S2: default to 5060 for sip transports, 5061 only for TLS.
    pub fn effective_port(&self) -> u16 {
        self.sent_port.unwrap_or(if self.transport.eq_ignore_ascii_case("TLS") { 5061 } else { 5060 })
    }

    /// `protocol-name "/" protocol-version "/" transport SP sent-by
    /// (:port)? (;params)*`. Bracketed IPv6 recognised by a leading `[`;
    /// the parser skips to `]` before seeking the optional `:port`
    /// (spec.md §4.2 Via semantics).
    pub fn parse(cursor: &mut ParseCursor<'_>) -> Result<Via, ParseError> {
        cursor.skip_whitespace();
        let protocol_name = cursor.skip_to_char(b'/')?;
        cursor.skip_char(b'/')?;
        let protocol_version = cursor.skip_to_char(b'/')?;
        cursor.skip_char(b'/')?;
        let transport = cursor.skip_non_whitespace();
        cursor.skip_whitespace();

        let (sent_host, is_ipv6) = if cursor.peek_char() == Some(b'[') {
            cursor.skip_char(b'[')?;
            let h = cursor.skip_to_char(b']')?;
            cursor.skip_char(b']')?;
            (h, true)
        } else {
            let h = cursor.skip_to_one_of_or_eof(b":; \t\r\n");
            (h, false)
        };
        if sent_host.is_empty() {
            parse_fail!(cursor, "Via missing sent-by host");
        }

        let sent_port = if cursor.peek_char() == Some(b':') {
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

        Ok(Via {
            protocol_name: String::from_utf8_lossy(protocol_name).to_string(),
            protocol_version: String::from_utf8_lossy(protocol_version).to_string(),
            transport: String::from_utf8_lossy(transport).to_string(),
            sent_host: String::from_utf8_lossy(sent_host).to_string(),
            sent_host_is_ipv6_literal: is_ipv6,
            sent_port,
            params,
        })
    }

    pub fn encode(&self, out: &mut String) {
        out.push_str(&self.protocol_name);
        out.push('/');
        out.push_str(&self.protocol_version);
        out.push('/');
        out.push_str(&self.transport);
        out.push(' ');
        if self.sent_host_is_ipv6_literal {
            out.push('[');
            out.push_str(&self.sent_host);
            out.push(']');
        } else {
            out.push_str(&self.sent_host);
        }
        if let Some(port) = self.sent_port {
            out.push(':');
            out.push_str(&port.to_string());
        }
        self.params.encode(out);
    }
}

impl fmt::Display for Via {
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
    fn parses_ipv6_via_with_branch() {
        // S2
        let mut c = ParseCursor::new(b"SIP/2.0/UDP [2001:db8::1]:5060;branch=z9hG4bK-x");
        let via = Via::parse(&mut c).unwrap();
        assert_eq!(via.protocol_name, "SIP");
        assert_eq!(via.transport, "UDP");
        assert_eq!(via.sent_host, "2001:db8::1");
        assert!(via.sent_host_is_ipv6_literal);
        assert_eq!(via.sent_port, Some(5060));
        assert_eq!(via.branch(), Some("z9hG4bK-x"));
    }

    #[test]
    fn default_port_depends_on_transport() {
        let udp = Via::new("UDP", "host");
        let tls = Via::new("TLS", "host");
        assert_eq!(udp.effective_port(), 5060);
        assert_eq!(tls.effective_port(), 5061);
    }

    #[test]
    fn round_trips() {
        let mut c = ParseCursor::new(b"SIP/2.0/TCP example.com:5060;branch=z9hG4bK1;rport");
        let via = Via::parse(&mut c).unwrap();
        assert_eq!(via.to_string(), "SIP/2.0/TCP example.com:5060;branch=z9hG4bK1;rport");
    }
}
