use std::net::SocketAddr;
use std::time::Duration;

use rvoip_sip_core::message::SipMessage;
use rvoip_sip_core::types::header::{HeaderName, TypedHeader};
use rvoip_sip_core::types::status::StatusCode;
use rvoip_sip_core::types::status_line::StatusLine;
use rvoip_sip_transaction::config::{StrayResponsePolicy, TimerSettings};
use rvoip_sip_transaction::event::TransactionEvent;
use rvoip_sip_transaction::manager::TransactionManager;
use rvoip_sip_transport::selector::TransportSelector;
use rvoip_sip_transport::transport::TransportKind;

async fn bind(selector: &TransportSelector) -> SocketAddr {
    selector
        .add_transport(TransportKind::Udp, "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap()
        .local_addr()
}

fn invite_request(dest: SocketAddr) -> Vec<u8> {
    format!(
        "INVITE sip:bob@{dest} SIP/2.0\r\n\
Via: SIP/2.0/UDP 0.0.0.0:0\r\n\
Max-Forwards: 70\r\n\
To: <sip:bob@{dest}>\r\n\
From: <sip:alice@127.0.0.1>;tag=alice-tag\r\n\
Call-ID: cycle-test-invite@alice\r\n\
CSeq: 1 INVITE\r\n\
Content-Length: 0\r\n\r\n"
    )
    .into_bytes()
}

fn options_request(dest: SocketAddr) -> Vec<u8> {
    format!(
        "OPTIONS sip:bob@{dest} SIP/2.0\r\n\
Via: SIP/2.0/UDP 0.0.0.0:0\r\n\
Max-Forwards: 70\r\n\
To: <sip:bob@{dest}>\r\n\
From: <sip:alice@127.0.0.1>;tag=alice-tag\r\n\
Call-ID: cycle-test-options@alice\r\n\
CSeq: 1 OPTIONS\r\n\
Content-Length: 0\r\n\r\n"
    )
    .into_bytes()
}

/// Build a response reusing the inbound request's correlating headers,
/// the way a TU would (spec.md §4.2 response templating), adding a local
/// tag to To the way a server assigns one on first response.
fn response_for(request: &SipMessage, code: StatusCode, to_tag: &str) -> SipMessage {
    let mut resp = SipMessage::new_response(StatusLine::new(code));
    for name in [HeaderName::Via, HeaderName::From, HeaderName::CallId, HeaderName::CSeq] {
        if let Some(h) = request.header(&name) {
            resp.push_header(h.clone());
        }
    }
    let mut to_field = request.header(&HeaderName::To).unwrap().clone();
    if let Ok(TypedHeader::To(mut na)) = to_field.typed().map(|t| t.clone()) {
        na.set_tag(to_tag);
        to_field.set_typed(TypedHeader::To(na));
    }
    resp.push_header(to_field);
    resp.push_header(rvoip_sip_core::types::header::HeaderField::from_typed(
        HeaderName::ContentLength,
        TypedHeader::ContentLength(rvoip_sip_core::types::integer::IntegerCategory::new(0)),
    ));
    resp
}

#[tokio::test]
async fn invite_accepted_terminates_both_transactions_immediately() {
    let client_transport = TransportSelector::new();
    let server_transport = TransportSelector::new();
    bind(&client_transport).await;
    let server_addr = bind(&server_transport).await;

    let (mut client_mgr, mut client_tu) = TransactionManager::new(client_transport.clone(), TimerSettings::default());
    let (mut server_mgr, mut server_tu) = TransactionManager::new(server_transport.clone(), TimerSettings::default());

    let invite = SipMessage::parse(&invite_request(server_addr)).unwrap();
    let client_key = client_mgr.send_request(invite).await.unwrap();

    let (msg, ctx) = tokio::time::timeout(Duration::from_secs(1), server_transport.receive()).await.unwrap().unwrap();
    server_mgr.handle_incoming(msg, ctx).await.unwrap();

    let TransactionEvent::Request { key: server_key, request } = server_tu.recv().await.unwrap() else {
        panic!("expected a Request event for the inbound INVITE");
    };

    let ok = response_for(&request, StatusCode::OK, "bob-tag");
    server_mgr.send_response(&server_key, ok).await.unwrap();

    match server_tu.recv().await.unwrap() {
        TransactionEvent::Terminated { key } => assert_eq!(key, server_key),
        other => panic!("expected Terminated, got {other:?}"),
    }

    let (msg, ctx) = tokio::time::timeout(Duration::from_secs(1), client_transport.receive()).await.unwrap().unwrap();
    client_mgr.handle_incoming(msg, ctx).await.unwrap();

    match client_tu.recv().await.unwrap() {
        TransactionEvent::Final { key, response } => {
            assert_eq!(key, client_key);
            assert_eq!(response.status_line().unwrap().status_code, StatusCode::OK);
        }
        other => panic!("expected Final, got {other:?}"),
    }
    match client_tu.recv().await.unwrap() {
        TransactionEvent::Terminated { key } => assert_eq!(key, client_key),
        other => panic!("expected Terminated, got {other:?}"),
    }
}

#[tokio::test]
async fn invite_rejected_drives_ack_back_to_confirmed() {
    let client_transport = TransportSelector::new();
    let server_transport = TransportSelector::new();
    bind(&client_transport).await;
    let server_addr = bind(&server_transport).await;

    let (mut client_mgr, mut client_tu) = TransactionManager::new(client_transport.clone(), TimerSettings::default());
    let (mut server_mgr, mut server_tu) = TransactionManager::new(server_transport.clone(), TimerSettings::default());

    let invite = SipMessage::parse(&invite_request(server_addr)).unwrap();
    let client_key = client_mgr.send_request(invite).await.unwrap();

    let (msg, ctx) = tokio::time::timeout(Duration::from_secs(1), server_transport.receive()).await.unwrap().unwrap();
    server_mgr.handle_incoming(msg, ctx).await.unwrap();
    let TransactionEvent::Request { key: server_key, request } = server_tu.recv().await.unwrap() else {
        panic!("expected a Request event for the inbound INVITE");
    };

    let busy = response_for(&request, StatusCode(486), "bob-tag");
    server_mgr.send_response(&server_key, busy).await.unwrap();

    let (msg, ctx) = tokio::time::timeout(Duration::from_secs(1), client_transport.receive()).await.unwrap().unwrap();
    client_mgr.handle_incoming(msg, ctx).await.unwrap();
    match client_tu.recv().await.unwrap() {
        TransactionEvent::Final { key, response } => {
            assert_eq!(key, client_key);
            assert_eq!(response.status_line().unwrap().status_code, StatusCode(486));
        }
        other => panic!("expected Final, got {other:?}"),
    }

    // The client transaction's ACK lands on the server's socket; feeding
    // it back in should confirm the server transaction without raising a
    // second Request event (spec.md: "ACK matching is the TU's problem"
    // only for 2xx — a non-2xx ACK is absorbed by this transaction).
    let (msg, ctx) = tokio::time::timeout(Duration::from_secs(1), server_transport.receive()).await.unwrap().unwrap();
    assert!(msg.is_request());
    server_mgr.handle_incoming(msg, ctx).await.unwrap();
    assert!(server_tu.try_recv().is_err(), "ACK must not surface as a second Request event");
}

#[tokio::test(start_paused = true)]
async fn client_non_invite_times_out_with_no_responder() {
    let client_transport = TransportSelector::new();
    let deaf_transport = TransportSelector::new();
    bind(&client_transport).await;
    let deaf_addr = bind(&deaf_transport).await;

    let settings = TimerSettings::default();
    let (mut client_mgr, mut client_tu) = TransactionManager::new(client_transport.clone(), settings);

    let options = SipMessage::parse(&options_request(deaf_addr)).unwrap();
    let key = client_mgr.send_request(options).await.unwrap();

    tokio::time::advance(settings.timeout() + Duration::from_secs(1)).await;
    client_mgr.poll_timers().await;

    match client_tu.recv().await.unwrap() {
        TransactionEvent::TimedOut { key: k, response } => {
            assert_eq!(k, key);
            assert_eq!(response.status_line().unwrap().status_code, StatusCode::REQUEST_TIMEOUT);
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
    match client_tu.recv().await.unwrap() {
        TransactionEvent::Terminated { key: k } => assert_eq!(k, key),
        other => panic!("expected Terminated, got {other:?}"),
    }
}

/// A response matching no live client transaction is discarded by
/// default, and delivered as `StrayResponse` once the TU opts in
/// (spec.md §4.4 "configurable strayResponse flag").
#[tokio::test]
async fn stray_response_policy_gates_delivery_of_unmatched_responses() {
    let client_transport = TransportSelector::new();
    bind(&client_transport).await;
    let (mut discard_mgr, mut discard_tu) = TransactionManager::new(client_transport.clone(), TimerSettings::default());

    let mut stray = SipMessage::new_response(StatusLine::new(StatusCode::OK));
    stray.push_header(rvoip_sip_core::types::header::HeaderField::from_raw(
        HeaderName::Via,
        "SIP/2.0/UDP 0.0.0.0:0;branch=z9hG4bK-nonexistent",
    ));
    stray.push_header(rvoip_sip_core::types::header::HeaderField::from_raw(HeaderName::CSeq, "1 INVITE"));

    discard_mgr.handle_incoming(stray.clone(), dummy_context()).await.unwrap();
    assert!(discard_tu.try_recv().is_err(), "default policy must discard a stray response");

    let (mut deliver_mgr, mut deliver_tu) = TransactionManager::new(client_transport, TimerSettings::default());
    deliver_mgr.set_stray_response_policy(StrayResponsePolicy::Deliver);
    deliver_mgr.handle_incoming(stray, dummy_context()).await.unwrap();
    match deliver_tu.recv().await.unwrap() {
        TransactionEvent::StrayResponse { .. } => {}
        other => panic!("expected StrayResponse, got {other:?}"),
    }
}

fn dummy_context() -> rvoip_sip_transport::context::TransportContext {
    rvoip_sip_transport::context::TransportContext::new(
        "127.0.0.1:0".parse().unwrap(),
        "127.0.0.1:0".parse().unwrap(),
        TransportKind::Udp,
    )
}
