//! Message-level parser edge cases (spec.md §8 scenarios S1/S2 and the
//! header/body consistency checks around `Content-Length`).

use rvoip_sip_core::prelude::*;

#[test]
fn s1_cseq_sequence_and_method_edge_cases() {
    let mut ok = ParseCursor::new(b"15 ACK");
    assert_eq!(CSeq::parse(&mut ok).unwrap(), CSeq::new(15, Method::Ack));

    let mut missing_seq = ParseCursor::new(b"ACK");
    assert!(CSeq::parse(&mut missing_seq).is_err());

    let mut unknown = ParseCursor::new(b"1323333 InviTe");
    let cseq = CSeq::parse(&mut unknown).unwrap();
    assert_eq!(cseq.method, Method::Unknown("InviTe".to_string()));
    assert_eq!(cseq.to_string(), "1323333 InviTe");
}

#[test]
fn s2_via_with_ipv6_sent_by() {
    let mut c = ParseCursor::new(b"SIP/2.0/UDP [2001:db8::1]:5060;branch=z9hG4bK-x");
    let via = Via::parse(&mut c).unwrap();
    assert!(via.sent_host_is_ipv6_literal);
    assert_eq!(via.sent_host, "2001:db8::1");
    assert_eq!(via.branch(), Some("z9hG4bK-x"));
    assert_eq!(via.to_string(), "SIP/2.0/UDP [2001:db8::1]:5060;branch=z9hG4bK-x");
}

#[test]
fn rejects_message_whose_body_is_shorter_than_content_length_claims() {
    let raw = b"SIP/2.0 200 OK\r\nContent-Length: 10\r\n\r\ntoo short";
    let err = SipMessage::parse(raw).unwrap_err();
    assert!(matches!(err, Error::ContentLengthMismatch { expected: 10, actual: 9 }));
}

#[test]
fn missing_content_length_defaults_to_zero_length_body() {
    let raw = b"SIP/2.0 200 OK\r\n\r\n";
    let msg = SipMessage::parse(raw).unwrap();
    assert_eq!(msg.body.len(), 0);
}

#[test]
fn unknown_header_lines_are_preserved_as_generic_text() {
    let raw = b"SIP/2.0 200 OK\r\nX-Trace-Id: abc-123\r\nContent-Length: 0\r\n\r\n";
    let msg = SipMessage::parse(raw).unwrap();
    let field = msg.header(&HeaderName::Other("X-Trace-Id".to_string())).unwrap();
    assert_eq!(field.raw_value(), Some("abc-123"));
}
