use rvoip_sip_core::message::SipMessage;
use rvoip_sip_core::types::call_id::CallId;
use rvoip_sip_core::types::cseq::CSeq;
use rvoip_sip_core::types::header::{HeaderField, HeaderName, TypedHeader};
use rvoip_sip_core::types::integer::IntegerCategory;
use rvoip_sip_core::types::method::Method;
use rvoip_sip_core::types::name_addr::NameAddr;
use rvoip_sip_core::types::request_line::RequestLine;
use rvoip_sip_core::types::status::StatusCode;
use rvoip_sip_core::types::uri::{Scheme, Uri};

use crate::error::{Error, Result};
use crate::id::DialogId;
use crate::key::DialogKey;
use crate::request::{contact_uri, extract_route_set, generate_branch, typed_call_id, typed_cseq, typed_name_addr};
use crate::state::DialogState;

/// A SIP dialog (RFC 3261 §12, spec.md §4.6): the peer relationship
/// established by a dialog-creating request/response pair, identified by
/// `(Call-ID, local tag, remote tag)`. Owned exclusively by a
/// [`crate::set::DialogSet`] — everything outside this crate holds only
/// a [`DialogId`] handle (spec.md §9 "Forking ownership").
#[derive(Debug, Clone)]
pub struct Dialog {
    pub id: DialogId,
    pub state: DialogState,
    pub call_id: String,
    pub local_uri: Uri,
    pub remote_uri: Uri,
    /// `None` only for a UAS-side dialog whose first response (and thus
    /// local tag) has not yet been sent.
    pub local_tag: Option<String>,
    /// `None` for an early UAC dialog whose response carried no tag yet,
    /// or a UAS dialog before the peer's own tag is learned.
    pub remote_tag: Option<String>,
    pub local_cseq: u32,
    pub remote_cseq: Option<u32>,
    pub remote_target: Uri,
    pub route_set: Vec<Uri>,
    /// `true` for the side that sent the dialog-creating request (the
    /// Route-set reversal in [`crate::request::extract_route_set`]
    /// applies only here).
    pub is_initiator: bool,
    pub secure: bool,
}

impl Dialog {
    /// Build the UAC-side dialog from a 1xx-with-To-tag or 2xx response
    /// to `invite` (spec.md §4.6: "A dialog is created UAC-side from an
    /// early or final 2xx response that carries a To-tag"). `state`
    /// should be `Early` for a provisional response, `Confirmed` for a
    /// 2xx — the caller decides based on the response's status code.
    pub fn from_uac_response(invite: &SipMessage, response: &mut SipMessage, state: DialogState) -> Result<Dialog> {
        let call_id = typed_call_id(response)?;
        let from = typed_name_addr(invite, &HeaderName::From, "From")?;
        let to = typed_name_addr(response, &HeaderName::To, "To")?;
        let remote_tag = to
            .tag()
            .map(str::to_string)
            .ok_or_else(|| Error::ProtocolViolation("response establishing dialog carries no To-tag".into()))?;
        let local_tag = from
            .tag()
            .map(str::to_string)
            .ok_or_else(|| Error::ProtocolViolation("originating request carries no From-tag".into()))?;
        let local_cseq = typed_cseq(invite)?.sequence;
        let remote_target = contact_uri(response)?;
        let route_set = extract_route_set(response, true);
        let secure = invite.request_line().map(|rl| rl.uri.scheme == Scheme::Sips).unwrap_or(false);

        Ok(Dialog {
            id: DialogId::new(),
            state,
            call_id,
            local_uri: from.uri,
            remote_uri: to.uri,
            local_tag: Some(local_tag),
            remote_tag: Some(remote_tag),
            local_cseq,
            remote_cseq: None,
            remote_target,
            route_set,
            is_initiator: true,
            secure,
        })
    }

    /// Build the UAS-side early dialog from an incoming dialog-creating
    /// `request` (spec.md §4.6: "UAS-side from an incoming request that
    /// establishes a dialog"). `local_tag` is the tag this UA is about to
    /// attach to its own first response — generate one with
    /// [`crate::request::generate_tag`] before calling this if one has
    /// not already been chosen.
    pub fn from_uas_request(request: &mut SipMessage, local_tag: impl Into<String>) -> Result<Dialog> {
        let call_id = typed_call_id(request)?;
        let from = typed_name_addr(request, &HeaderName::From, "From")?;
        let to = typed_name_addr(request, &HeaderName::To, "To")?;
        let remote_tag = from.tag().map(str::to_string);
        let remote_cseq = typed_cseq(request)?.sequence;
        let remote_target = contact_uri(request)?;
        let route_set = extract_route_set(request, false);
        let secure = request.request_line().map(|rl| rl.uri.scheme == Scheme::Sips).unwrap_or(false);

        Ok(Dialog {
            id: DialogId::new(),
            state: DialogState::Early,
            call_id,
            local_uri: to.uri,
            remote_uri: from.uri,
            local_tag: Some(local_tag.into()),
            remote_tag,
            local_cseq: 0,
            remote_cseq: Some(remote_cseq),
            remote_target,
            route_set,
            is_initiator: false,
            secure,
        })
    }

    /// `(Call-ID, local tag, remote tag)` (RFC 3261 §12.1). `None` until
    /// this side's own tag has been assigned — an early UAS dialog
    /// before its first response is sent has no key to register yet.
    pub fn key(&self) -> Option<DialogKey> {
        Some(DialogKey::new(self.call_id.clone(), self.local_tag.clone()?, self.remote_tag.clone()))
    }

    /// Fold in a confirming 2xx: an early dialog learns the remote tag
    /// here if it did not already have one (forked early dialogs keep
    /// distinct remote tags per branch, spec.md §4.6 / S4), and adopts
    /// the 2xx's Contact as the new remote target (RFC 3261 §12.2.1.2
    /// target refresh).
    pub fn confirm_from_2xx(&mut self, response: &mut SipMessage) -> Result<()> {
        let to = typed_name_addr(response, &HeaderName::To, "To")?;
        if let Some(tag) = to.tag() {
            self.remote_tag.get_or_insert_with(|| tag.to_string());
        }
        if let Ok(uri) = contact_uri(response) {
            self.remote_target = uri;
        }
        self.state = DialogState::Confirmed;
        Ok(())
    }

    pub fn terminate(&mut self) {
        self.state = DialogState::Terminated;
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    /// Reject an in-dialog request whose CSeq does not strictly exceed
    /// the last one seen from the peer (spec.md §7 ProtocolViolation:
    /// "dialog CSeq regression"), otherwise record it as the new high
    /// watermark (spec.md §8 property 5).
    pub fn update_remote_sequence(&mut self, request: &mut SipMessage) -> Result<()> {
        let cseq = typed_cseq(request)?.sequence;
        if let Some(prev) = self.remote_cseq {
            if cseq <= prev {
                return Err(Error::ProtocolViolation(format!(
                    "in-dialog CSeq did not increase: got {cseq}, previous {prev}"
                )));
            }
        }
        self.remote_cseq = Some(cseq);
        Ok(())
    }

    /// `makeRequest(method)` (spec.md §4.6): a fully populated in-dialog
    /// request — Request-URI from the remote target, frozen Route set,
    /// tagged From/To, a fresh branch, and the next local CSeq. ACK
    /// reuses the CSeq of the INVITE it acknowledges (RFC 3261
    /// §17.1.1.3) rather than advancing it, matching spec.md §8
    /// property 5's "except ACK" carve-out.
    pub fn make_request(&mut self, method: Method, local_contact: Uri) -> SipMessage {
        if method != Method::Ack {
            self.local_cseq += 1;
        }

        let mut request = SipMessage::new_request(RequestLine::new(method.clone(), self.remote_target.clone()));

        let mut via = rvoip_sip_core::types::via::Via::new(
            local_contact.transport().unwrap_or("UDP").to_ascii_uppercase(),
            local_contact.host.clone(),
        );
        via.sent_host_is_ipv6_literal = local_contact.host_is_ipv6_literal;
        via.sent_port = local_contact.port;
        via.set_branch(generate_branch());
        request.push_header(HeaderField::from_typed(HeaderName::Via, TypedHeader::Via(via)));

        for route in self.route_set.iter().rev() {
            request.push_header(HeaderField::from_typed(
                HeaderName::Route,
                TypedHeader::Route(NameAddr::new(route.clone())),
            ));
        }

        let mut from = NameAddr::new(self.local_uri.clone());
        if let Some(tag) = &self.local_tag {
            from.set_tag(tag.clone());
        }
        request.push_header(HeaderField::from_typed(HeaderName::From, TypedHeader::From(from)));

        let mut to = NameAddr::new(self.remote_uri.clone());
        if let Some(tag) = &self.remote_tag {
            to.set_tag(tag.clone());
        }
        request.push_header(HeaderField::from_typed(HeaderName::To, TypedHeader::To(to)));

        request.push_header(HeaderField::from_typed(
            HeaderName::CallId,
            TypedHeader::CallId(CallId::new(self.call_id.clone())),
        ));
        request.push_header(HeaderField::from_typed(
            HeaderName::CSeq,
            TypedHeader::CSeq(CSeq::new(self.local_cseq, method)),
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

    /// `makeResponse(code, reason?)` for an in-dialog request: delegates
    /// to [`crate::request::make_response`], supplying this dialog's own
    /// local tag so a response to an already-established dialog never
    /// mints a second one.
    pub fn make_response(&self, request: &SipMessage, code: StatusCode, reason: Option<&str>) -> SipMessage {
        crate::request::make_response(request, code, reason, self.local_tag.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvoip_sip_core::types::status::StatusCode;

    fn uri(user: &str, host: &str) -> Uri {
        let mut u = Uri::new(Scheme::Sip, host);
        u.user = Some(user.to_string());
        u
    }

    fn sample_invite() -> SipMessage {
        let mut invite = SipMessage::new_request(RequestLine::new(Method::Invite, uri("bob", "biloxi.com")));
        let mut from = NameAddr::new(uri("alice", "atlanta.com"));
        from.set_tag("1928301774");
        invite.push_header(HeaderField::from_typed(HeaderName::From, TypedHeader::From(from)));
        invite.push_header(HeaderField::from_typed(HeaderName::To, TypedHeader::To(NameAddr::new(uri("bob", "biloxi.com")))));
        invite.push_header(HeaderField::from_typed(
            HeaderName::CallId,
            TypedHeader::CallId(CallId::new("a84b4c76e66710@pc33.atlanta.com")),
        ));
        invite.push_header(HeaderField::from_typed(HeaderName::CSeq, TypedHeader::CSeq(CSeq::new(314159, Method::Invite))));
        invite.push_header(HeaderField::from_typed(
            HeaderName::Contact,
            TypedHeader::Contact(NameAddr::new(uri("alice", "pc33.atlanta.com"))),
        ));
        invite
    }

    fn sample_2xx(invite: &SipMessage, to_tag: &str) -> SipMessage {
        let mut response = crate::request::make_response(invite, StatusCode::OK, None, Some(to_tag));
        response.push_header(HeaderField::from_typed(
            HeaderName::Contact,
            TypedHeader::Contact(NameAddr::new(uri("bob", "192.0.2.4"))),
        ));
        response
    }

    #[test]
    fn uac_dialog_from_2xx_adopts_tags_and_remote_target() {
        let invite = sample_invite();
        let mut response = sample_2xx(&invite, "a6c85cf");
        let dialog = Dialog::from_uac_response(&invite, &mut response, DialogState::Confirmed).unwrap();

        assert_eq!(dialog.local_tag.as_deref(), Some("1928301774"));
        assert_eq!(dialog.remote_tag.as_deref(), Some("a6c85cf"));
        assert_eq!(dialog.remote_target.user.as_deref(), Some("bob"));
        assert!(dialog.is_initiator);
        assert!(dialog.state.is_confirmed());
    }

    #[test]
    fn make_request_increments_cseq_except_for_ack() {
        let invite = sample_invite();
        let mut response = sample_2xx(&invite, "a6c85cf");
        let mut dialog = Dialog::from_uac_response(&invite, &mut response, DialogState::Confirmed).unwrap();
        let starting_cseq = dialog.local_cseq;

        let ack = dialog.make_request(Method::Ack, uri("alice", "pc33.atlanta.com"));
        assert_eq!(dialog.local_cseq, starting_cseq);
        let ack_cseq = typed_cseq(&ack).unwrap();
        assert_eq!(ack_cseq.sequence, starting_cseq);
        assert_eq!(ack_cseq.method, Method::Ack);

        let bye = dialog.make_request(Method::Bye, uri("alice", "pc33.atlanta.com"));
        assert_eq!(dialog.local_cseq, starting_cseq + 1);
        assert_eq!(typed_cseq(&bye).unwrap().sequence, starting_cseq + 1);
    }

    #[test]
    fn update_remote_sequence_rejects_non_increasing_cseq() {
        let mut request = sample_invite();
        let mut dialog = Dialog::from_uas_request(&mut request, "uas-tag").unwrap();
        assert_eq!(dialog.remote_cseq, Some(314159));

        let mut stale = sample_invite();
        assert!(dialog.update_remote_sequence(&mut stale).is_err());

        let mut newer = sample_invite();
        newer.header_mut(&HeaderName::CSeq).unwrap().set_typed(TypedHeader::CSeq(CSeq::new(314160, Method::Invite)));
        assert!(dialog.update_remote_sequence(&mut newer).is_ok());
        assert_eq!(dialog.remote_cseq, Some(314160));
    }
}
