use std::net::SocketAddr;
use std::time::Duration;

use rvoip_sip_transport::selector::TransportSelector;
use rvoip_sip_transport::transport::{Transport, TransportKind};

const REGISTER: &[u8] = b"REGISTER sip:example.com SIP/2.0\r\n\
Via: SIP/2.0/UDP 127.0.0.1:0;branch=z9hG4bK-test\r\n\
Max-Forwards: 70\r\n\
To: <sip:alice@example.com>\r\n\
From: <sip:alice@example.com>;tag=abc\r\n\
Call-ID: loopback-test@example.com\r\n\
CSeq: 1 REGISTER\r\n\
Content-Length: 0\r\n\r\n";

#[tokio::test]
async fn udp_round_trip_between_two_listeners() {
    let a = TransportSelector::new();
    let b = TransportSelector::new();
    let addr_a: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let addr_b: SocketAddr = "127.0.0.1:0".parse().unwrap();

    let transport_a = a.add_transport(TransportKind::Udp, addr_a).await.unwrap();
    let transport_b = b.add_transport(TransportKind::Udp, addr_b).await.unwrap();

    transport_a.send(transport_b.local_addr(), REGISTER).await.unwrap();

    let (msg, ctx) = tokio::time::timeout(Duration::from_secs(1), b.receive()).await.unwrap().unwrap();
    assert!(msg.is_request());
    assert_eq!(ctx.kind, TransportKind::Udp);
    assert_eq!(ctx.peer_address, transport_a.local_addr());
}

#[tokio::test]
async fn add_transport_is_idempotent_by_kind_and_address() {
    let selector = TransportSelector::new();
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let first = selector.add_transport(TransportKind::Udp, addr).await.unwrap();
    let bound = first.local_addr();
    let second = selector.add_transport(TransportKind::Udp, bound).await.unwrap();
    assert_eq!(first.local_addr(), second.local_addr());
}
