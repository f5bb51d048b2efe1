use std::fmt;

/// A SIP method. Unknown methods round-trip byte-for-byte via `Unknown`,
/// per spec.md §4.2 CSeq/RequestLine parse semantics ("Unknown methods
/// MUST round-trip as an UNKNOWN tag carrying the original bytes").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Register,
    Options,
    Info,
    Message,
    Subscribe,
    Notify,
    Refer,
    Update,
    Prack,
    Publish,
    /// Carries the original wire bytes of the method token, uppercased
    /// for comparison but rendered back verbatim.
    Unknown(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Register => "REGISTER",
            Method::Options => "OPTIONS",
            Method::Info => "INFO",
            Method::Message => "MESSAGE",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Refer => "REFER",
            Method::Update => "UPDATE",
            Method::Prack => "PRACK",
            Method::Publish => "PUBLISH",
            Method::Unknown(raw) => raw.as_str(),
        }
    }

    /// Parse a method token. Never fails: an unrecognised token becomes
    /// `Unknown` carrying the bytes as given (case preserved for
    /// re-encoding, matched case-insensitively by [`PartialEq`] below via
    /// [`Method::parse`] normalising only for the match arms).
    pub fn parse(token: &[u8]) -> Method {
        let s = String::from_utf8_lossy(token).to_string();
        match s.to_ascii_uppercase().as_str() {
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "REGISTER" => Method::Register,
            "OPTIONS" => Method::Options,
            "INFO" => Method::Info,
            "MESSAGE" => Method::Message,
            "SUBSCRIBE" => Method::Subscribe,
            "NOTIFY" => Method::Notify,
            "REFER" => Method::Refer,
            "UPDATE" => Method::Update,
            "PRACK" => Method::Prack,
            "PUBLISH" => Method::Publish,
            _ => Method::Unknown(s),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_round_trips_original_case() {
        let m = Method::parse(b"InviTe");
        // S1: "1323333 InviTe" -> UNKNOWN("InviTe")
        assert_eq!(m, Method::Unknown("InviTe".to_string()));
        assert_eq!(m.as_str(), "InviTe");
    }

    #[test]
    fn known_methods_parse_case_insensitively() {
        assert_eq!(Method::parse(b"ack"), Method::Ack);
        assert_eq!(Method::parse(b"Bye"), Method::Bye);
    }
}
