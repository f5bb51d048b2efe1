use rand::RngCore;
use uuid::Uuid;

use rvoip_sip_core::message::SipMessage;
use rvoip_sip_core::types::call_id::CallId;
use rvoip_sip_core::types::cseq::CSeq;
use rvoip_sip_core::types::header::{HeaderField, HeaderName, TypedHeader};
use rvoip_sip_core::types::integer::IntegerCategory;
use rvoip_sip_core::types::method::Method;
use rvoip_sip_core::types::name_addr::NameAddr;
use rvoip_sip_core::types::request_line::RequestLine;
use rvoip_sip_core::types::status::StatusCode;
use rvoip_sip_core::types::status_line::StatusLine;
use rvoip_sip_core::types::uri::Uri;

use crate::error::{Error, Result};

/// `z9hG4bK`-prefixed per RFC 3261 §8.1.1.7, same shape
/// `rvoip-sip-transaction`'s manager generates for outbound requests —
/// duplicated here rather than shared because a dialog's requests are
/// built before a transaction exists to own the branch.
pub(crate) fn generate_branch() -> String {
    let mut bytes = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut out = String::from("z9hG4bK");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// A From/To tag: opaque per RFC 3261 §19.3, random is sufficient.
pub(crate) fn generate_tag() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn generate_call_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn typed_call_id(msg: &SipMessage) -> Result<String> {
    let mut field = msg.header(&HeaderName::CallId).cloned().ok_or(Error::MissingHeader("Call-ID"))?;
    match field.typed().map_err(rvoip_sip_core::error::Error::Parse)?.clone() {
        TypedHeader::CallId(id) => Ok(id.0),
        _ => Err(Error::ProtocolViolation("Call-ID header did not parse as a token".into())),
    }
}

pub(crate) fn typed_cseq(msg: &SipMessage) -> Result<CSeq> {
    let mut field = msg.header(&HeaderName::CSeq).cloned().ok_or(Error::MissingHeader("CSeq"))?;
    match field.typed().map_err(rvoip_sip_core::error::Error::Parse)?.clone() {
        TypedHeader::CSeq(cseq) => Ok(cseq),
        _ => Err(Error::ProtocolViolation("CSeq header did not parse".into())),
    }
}

pub(crate) fn typed_name_addr(msg: &SipMessage, name: &HeaderName, label: &'static str) -> Result<NameAddr> {
    let mut field = msg.header(name).cloned().ok_or(Error::MissingHeader(label))?;
    match field.typed().map_err(rvoip_sip_core::error::Error::Parse)?.clone() {
        TypedHeader::From(na)
        | TypedHeader::To(na)
        | TypedHeader::Contact(na)
        | TypedHeader::Route(na)
        | TypedHeader::RecordRoute(na) => Ok(na),
        _ => Err(Error::ProtocolViolation(format!("{label} header did not parse as a name-addr"))),
    }
}

pub(crate) fn contact_uri(msg: &SipMessage) -> Result<Uri> {
    Ok(typed_name_addr(msg, &HeaderName::Contact, "Contact")?.uri)
}

/// Record-Route set frozen at dialog establishment, reversed for the
/// side that sent the original request (spec.md §4.6 "Route-set is
/// frozen at dialog establishment from Record-Route in reverse order").
pub(crate) fn extract_route_set(msg: &SipMessage, reverse_for_initiator: bool) -> Vec<Uri> {
    let mut routes: Vec<Uri> = msg
        .headers_named(&HeaderName::RecordRoute)
        .filter_map(|h| {
            let mut field = h.clone();
            match field.typed().ok()?.clone() {
                TypedHeader::RecordRoute(na) => Some(na.uri),
                _ => None,
            }
        })
        .collect();
    if reverse_for_initiator {
        routes.reverse();
    }
    routes
}

/// `makeResponse(request, code, reason?)` (spec.md §4.6): copies the Via
/// stack, From, Call-ID, CSeq verbatim, and adds a To-tag on any response
/// above 100 Trying that doesn't already carry one — generating one if
/// `local_tag` isn't supplied. This is free-standing rather than a
/// `Dialog` method because the first response to a dialog-establishing
/// request is built *before* the dialog exists.
pub fn make_response(request: &SipMessage, code: StatusCode, reason: Option<&str>, local_tag: Option<&str>) -> SipMessage {
    let status_line = match reason {
        Some(r) => StatusLine { sip_version: "SIP/2.0".to_string(), status_code: code, reason_phrase: r.to_string() },
        None => StatusLine::new(code),
    };
    let mut response = SipMessage::new_response(status_line);

    for name in [HeaderName::Via, HeaderName::From, HeaderName::CallId, HeaderName::CSeq] {
        for h in request.headers_named(&name) {
            response.push_header(h.clone());
        }
    }

    if let Some(mut to) = request.header(&HeaderName::To).cloned() {
        if code.0 > 100 {
            if let Ok(TypedHeader::To(mut na)) = to.typed().cloned() {
                if na.tag().is_none() {
                    na.set_tag(local_tag.map(str::to_string).unwrap_or_else(generate_tag));
                }
                to.set_typed(TypedHeader::To(na));
            }
        }
        response.push_header(to);
    }

    response.push_header(HeaderField::from_typed(
        HeaderName::ContentLength,
        TypedHeader::ContentLength(IntegerCategory::new(0)),
    ));
    response
}

fn via_for(local_contact: &Uri) -> rvoip_sip_core::types::via::Via {
    let mut via = rvoip_sip_core::types::via::Via::new(
        local_contact.transport().unwrap_or("UDP").to_ascii_uppercase(),
        local_contact.host.clone(),
    );
    via.sent_host_is_ipv6_literal = local_contact.host_is_ipv6_literal;
    via.sent_port = local_contact.port;
    via.set_branch(generate_branch());
    via
}

fn out_of_dialog_skeleton(method: Method, request_uri: Uri, local_contact: Uri) -> SipMessage {
    let mut request = SipMessage::new_request(RequestLine::new(method.clone(), request_uri));
    request.push_header(HeaderField::from_typed(HeaderName::Via, TypedHeader::Via(via_for(&local_contact))));
    request.push_header(HeaderField::from_typed(
        HeaderName::CSeq,
        TypedHeader::CSeq(CSeq::new(1, method)),
    ));
    request.push_header(HeaderField::from_typed(
        HeaderName::CallId,
        TypedHeader::CallId(CallId::new(generate_call_id())),
    ));
    request.push_header(HeaderField::from_typed(
        HeaderName::Contact,
        TypedHeader::Contact(NameAddr::new(local_contact)),
    ));
    request.push_header(HeaderField::from_typed(
        HeaderName::MaxForwards,
        TypedHeader::MaxForwards(IntegerCategory::new(70)),
    ));
    request.push_header(HeaderField::from_typed(
        HeaderName::ContentLength,
        TypedHeader::ContentLength(IntegerCategory::new(0)),
    ));
    request
}

/// `makeInitialRegister` (spec.md §4.6): registering an AOR with
/// `registrar` does not establish a dialog, but shares this module's
/// request-templating shape (fresh Call-ID, CSeq 1, generated From-tag).
pub fn make_initial_register(registrar: Uri, aor: NameAddr, local_contact: Uri, expires: u32) -> SipMessage {
    let mut request = out_of_dialog_skeleton(Method::Register, registrar.clone(), local_contact);

    let mut from = aor.clone();
    from.set_tag(generate_tag());
    request.push_header(HeaderField::from_typed(HeaderName::From, TypedHeader::From(from)));
    request.push_header(HeaderField::from_typed(HeaderName::To, TypedHeader::To(aor)));
    request.push_header(HeaderField::from_typed(
        HeaderName::Expires,
        TypedHeader::Expires(IntegerCategory::new(expires)),
    ));
    request
}

/// `makeInitialSubscribe` (spec.md §4.6): out-of-dialog SUBSCRIBE that
/// creates a dialog on the first `202`/`200` (RFC 6665 §4.1.2).
pub fn make_initial_subscribe(target: NameAddr, from_aor: NameAddr, local_contact: Uri, event: &str, expires: u32) -> SipMessage {
    let mut request = out_of_dialog_skeleton(Method::Subscribe, target.uri.clone(), local_contact);

    let mut from = from_aor;
    from.set_tag(generate_tag());
    request.push_header(HeaderField::from_typed(HeaderName::From, TypedHeader::From(from)));
    request.push_header(HeaderField::from_typed(HeaderName::To, TypedHeader::To(target)));
    request.push_header(HeaderField::from_typed(
        HeaderName::Event,
        TypedHeader::Event(rvoip_sip_core::types::token::Token::new(event.to_string())),
    ));
    request.push_header(HeaderField::from_typed(
        HeaderName::Expires,
        TypedHeader::Expires(IntegerCategory::new(expires)),
    ));
    request
}

/// `makeInitialInvite` (spec.md §4.6): out-of-dialog INVITE that creates
/// a [`crate::set::DialogSet`] the moment it is sent (forking begins as
/// soon as the first early response arrives).
pub fn make_initial_invite(target: NameAddr, from_aor: NameAddr, local_contact: Uri) -> SipMessage {
    let mut request = out_of_dialog_skeleton(Method::Invite, target.uri.clone(), local_contact);

    let mut from = from_aor;
    from.set_tag(generate_tag());
    request.push_header(HeaderField::from_typed(HeaderName::From, TypedHeader::From(from)));
    request.push_header(HeaderField::from_typed(HeaderName::To, TypedHeader::To(target)));
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvoip_sip_core::types::uri::Scheme;

    fn uri(user: &str) -> Uri {
        let mut u = Uri::new(Scheme::Sip, "example.com");
        u.user = Some(user.to_string());
        u
    }

    #[test]
    fn make_response_adds_to_tag_above_100() {
        let mut invite = SipMessage::new_request(RequestLine::new(Method::Invite, uri("bob")));
        invite.push_header(HeaderField::from_typed(HeaderName::Via, TypedHeader::Via(via_for(&uri("alice")))));
        invite.push_header(HeaderField::from_typed(
            HeaderName::From,
            TypedHeader::From(NameAddr::new(uri("alice"))),
        ));
        invite.push_header(HeaderField::from_typed(HeaderName::To, TypedHeader::To(NameAddr::new(uri("bob")))));
        invite.push_header(HeaderField::from_typed(
            HeaderName::CallId,
            TypedHeader::CallId(CallId::new("abc@alice")),
        ));
        invite.push_header(HeaderField::from_typed(HeaderName::CSeq, TypedHeader::CSeq(CSeq::new(1, Method::Invite))));

        let mut ringing = make_response(&invite, StatusCode::RINGING, None, Some("bob-tag"));
        let to = typed_name_addr(&ringing, &HeaderName::To, "To").unwrap();
        assert_eq!(to.tag(), Some("bob-tag"));

        let mut trying = make_response(&invite, StatusCode::TRYING, None, None);
        let to_trying = typed_name_addr(&trying, &HeaderName::To, "To").unwrap();
        assert_eq!(to_trying.tag(), None);
        let _ = (ringing.encode(), trying.encode());
    }

    #[test]
    fn make_initial_register_has_fresh_call_id_and_from_tag() {
        let registrar = uri("registrar");
        let aor = NameAddr::new(uri("alice"));
        let contact = uri("alice-contact");
        let register = make_initial_register(registrar, aor, contact, 3600);
        let from = typed_name_addr(&register, &HeaderName::From, "From").unwrap();
        assert!(from.tag().is_some());
        assert!(typed_call_id(&register).is_ok());
    }
}
