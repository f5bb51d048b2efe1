//! Round-trip and idempotent-parse properties (spec.md §8 properties 1-2):
//! re-encoding an unmutated message reproduces its wire bytes, and
//! parsing that output again yields an equal message.

use rvoip_sip_core::prelude::*;

const INVITE: &[u8] = b"INVITE sip:bob@example.com SIP/2.0\r\n\
Via: SIP/2.0/UDP pc33.example.com;branch=z9hG4bK776asdhds\r\n\
Max-Forwards: 70\r\n\
To: Bob <sip:bob@example.com>\r\n\
From: Alice <sip:alice@example.com>;tag=1928301774\r\n\
Call-ID: a84b4c76e66710@pc33.example.com\r\n\
CSeq: 314159 INVITE\r\n\
Contact: <sip:alice@pc33.example.com>\r\n\
Content-Length: 0\r\n\r\n";

const MESSAGE_WITH_BODY: &[u8] = b"MESSAGE sip:bob@example.com SIP/2.0\r\n\
Via: SIP/2.0/UDP pc33.example.com;branch=z9hG4bK1\r\n\
Max-Forwards: 70\r\n\
To: <sip:bob@example.com>\r\n\
From: <sip:alice@example.com>;tag=49\r\n\
Call-ID: msg1@pc33.example.com\r\n\
CSeq: 1 MESSAGE\r\n\
Content-Type: text/plain\r\n\
Content-Length: 5\r\n\r\nhello";

#[test]
fn invite_round_trips_byte_identical() {
    let parsed = SipMessage::parse(INVITE).unwrap();
    let encoded = parsed.encode_bytes();
    let reparsed = SipMessage::parse(&encoded).unwrap();
    assert_eq!(reparsed.encode_bytes(), parsed.encode_bytes());
}

#[test]
fn message_with_body_preserves_body_bytes_through_round_trip() {
    let parsed = SipMessage::parse(MESSAGE_WITH_BODY).unwrap();
    assert_eq!(parsed.body, b"hello");
    let encoded = parsed.encode_bytes();
    let reparsed = SipMessage::parse(&encoded).unwrap();
    assert_eq!(reparsed.body, b"hello");
}

#[test]
fn parsing_is_idempotent() {
    let first = SipMessage::parse(INVITE).unwrap();
    let second = SipMessage::parse(&first.encode_bytes()).unwrap();
    let third = SipMessage::parse(&second.encode_bytes()).unwrap();
    assert_eq!(second.encode_bytes(), third.encode_bytes());
}

#[test]
fn typed_header_access_round_trips_via_branch() {
    let mut parsed = SipMessage::parse(INVITE).unwrap();
    let via = parsed.header_mut(&HeaderName::Via).unwrap();
    match via.typed().unwrap() {
        TypedHeader::Via(v) => assert_eq!(v.branch(), Some("z9hG4bK776asdhds")),
        other => panic!("expected Via, got {other:?}"),
    }
}
