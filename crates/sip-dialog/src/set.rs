use std::collections::HashMap;
use std::net::SocketAddr;

use rvoip_sip_core::message::SipMessage;
use rvoip_sip_core::types::method::Method;
use rvoip_sip_core::types::uri::Uri;

use crate::dialog::Dialog;
use crate::error::{Error, Result};
use crate::id::{DialogId, DialogSetId};
use crate::request::typed_name_addr;
use crate::state::DialogState;

/// How a [`DialogSet`] disposes of forked final responses to the same
/// INVITE (spec.md §4.6 forking). `Automatic` is what a simple UA wants:
/// commit to the first 2xx, silently ACK+BYE anything that arrives
/// after. `Manual` hands every forked dialog to the TU and lets it
/// decide, for UAs that actually want to ring more than one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkPolicy {
    Automatic,
    Manual,
}

/// What a [`DialogSet`] wants the caller to do after feeding it a
/// response (spec.md §4.6 / §8 property 6). `SendAck`/`SendBye` are
/// fully-built, ready-to-send requests — the caller only needs to hand
/// them to a transaction.
#[derive(Debug)]
pub enum ForkAction {
    Deliver(DialogId),
    SendAck(SipMessage),
    SendBye(SipMessage),
}

/// An abstraction over SDP offer/answer fix-up, deferred until the media
/// collaborator reports its transport tuple (spec.md §4.6
/// "`pendingOffer`/`pendingAnswer` ... fixed up by an abstract
/// `fixUpSdp` callback"). This crate only carries the bytes; it has no
/// opinion on SDP syntax.
pub trait SdpFixup {
    fn fix_up(&self, body: &[u8], local_transport: SocketAddr) -> Vec<u8>;
}

/// The set of dialogs that may result from a single UAC INVITE (RFC
/// 3261 §12.1.2, spec.md §4.6: "when a UAC INVITE is sent, a DialogSet
/// is created; each early dialog that results from a distinct To-tag is
/// a member"). Sole owner of its member [`Dialog`]s — callers outside
/// this crate only ever see a [`DialogId`] handle (spec.md §9 "Forking
/// ownership").
#[derive(Debug)]
pub struct DialogSet {
    pub id: DialogSetId,
    invite: SipMessage,
    local_contact: Uri,
    policy: ForkPolicy,
    dialogs: HashMap<String, Dialog>,
    /// Remote tag of the branch this set has committed to, once one
    /// 2xx has been accepted (`Automatic` policy only).
    committed: Option<String>,
    pending_offer: Option<Vec<u8>>,
    pending_answer: Option<Vec<u8>>,
}

impl DialogSet {
    pub fn new(id: DialogSetId, invite: SipMessage, local_contact: Uri, policy: ForkPolicy) -> Self {
        DialogSet {
            id,
            invite,
            local_contact,
            policy,
            dialogs: HashMap::new(),
            committed: None,
            pending_offer: None,
            pending_answer: None,
        }
    }

    pub fn policy(&self) -> ForkPolicy {
        self.policy
    }

    pub fn get(&self, id: DialogId) -> Option<&Dialog> {
        self.dialogs.values().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: DialogId) -> Option<&mut Dialog> {
        self.dialogs.values_mut().find(|d| d.id == id)
    }

    /// Look up a member dialog by the peer tag a [`crate::registry::DialogRegistry`]
    /// lookup resolved (a caller holding only a [`crate::key::DialogKey`],
    /// not yet a [`DialogId`], reaches a dialog this way).
    pub fn get_by_remote_tag(&self, tag: &str) -> Option<&Dialog> {
        self.dialogs.get(tag)
    }

    pub fn get_mut_by_remote_tag(&mut self, tag: &str) -> Option<&mut Dialog> {
        self.dialogs.get_mut(tag)
    }

    pub fn dialogs(&self) -> impl Iterator<Item = &Dialog> {
        self.dialogs.values()
    }

    /// True once this set has committed to a different branch than
    /// `id` — a forked dialog that lost the race (spec.md §4.6
    /// `isStaleFork`). Always `false` under `Manual` policy, since
    /// manual sets never commit.
    pub fn is_stale_fork(&self, id: DialogId) -> bool {
        match (&self.committed, self.get(id)) {
            (Some(committed), Some(dialog)) => dialog.remote_tag.as_deref() != Some(committed.as_str()),
            _ => false,
        }
    }

    fn remote_tag_of(response: &mut SipMessage) -> Result<String> {
        typed_name_addr(response, &rvoip_sip_core::types::header::HeaderName::To, "To")?
            .tag()
            .map(str::to_string)
            .ok_or_else(|| Error::ProtocolViolation("response carries no To-tag".into()))
    }

    /// Feed in a 1xx with a To-tag: creates (or updates) the early
    /// dialog for that branch and returns its handle.
    pub fn add_early(&mut self, response: &mut SipMessage) -> Result<DialogId> {
        let remote_tag = Self::remote_tag_of(response)?;
        if let Some(existing) = self.dialogs.get(&remote_tag) {
            return Ok(existing.id);
        }
        let dialog = Dialog::from_uac_response(&self.invite, response, DialogState::Early)?;
        let id = dialog.id;
        self.dialogs.insert(remote_tag, dialog);
        Ok(id)
    }

    fn confirm(&mut self, remote_tag: String, response: &mut SipMessage) -> Result<DialogId> {
        if let Some(dialog) = self.dialogs.get_mut(&remote_tag) {
            dialog.confirm_from_2xx(response)?;
            return Ok(dialog.id);
        }
        let dialog = Dialog::from_uac_response(&self.invite, response, DialogState::Confirmed)?;
        let id = dialog.id;
        self.dialogs.insert(remote_tag, dialog);
        Ok(id)
    }

    /// Feed in a final response to the original INVITE (spec.md §4.6 /
    /// §8 property 6 "forking safety"). Non-2xx finals terminate that
    /// branch only and never produce an action. For 2xx under
    /// `Automatic` policy: the first confirms and commits; any later
    /// one is a stale fork and gets an ACK and a BYE built for it
    /// instead of being delivered. Under `Manual` policy every 2xx is
    /// confirmed and delivered; the caller is responsible for disposing
    /// of branches it doesn't want.
    pub fn on_final_response(&mut self, response: &mut SipMessage) -> Result<Vec<ForkAction>> {
        let code = response
            .status_line()
            .ok_or_else(|| Error::ProtocolViolation("on_final_response given a request, not a response".into()))?
            .status_code;
        if !code.is_success() {
            return Ok(Vec::new());
        }

        let remote_tag = Self::remote_tag_of(response)?;

        match self.policy {
            ForkPolicy::Automatic => {
                if let Some(committed) = self.committed.clone() {
                    if committed != remote_tag {
                        let mut dialog = Dialog::from_uac_response(&self.invite, response, DialogState::Confirmed)?;
                        let ack = dialog.make_request(Method::Ack, self.local_contact.clone());
                        let bye = dialog.make_request(Method::Bye, self.local_contact.clone());
                        return Ok(vec![ForkAction::SendAck(ack), ForkAction::SendBye(bye)]);
                    }
                    return Ok(Vec::new());
                }
                let id = self.confirm(remote_tag.clone(), response)?;
                self.committed = Some(remote_tag);
                Ok(vec![ForkAction::Deliver(id)])
            }
            ForkPolicy::Manual => {
                let id = self.confirm(remote_tag, response)?;
                Ok(vec![ForkAction::Deliver(id)])
            }
        }
    }

    pub fn set_pending_offer(&mut self, sdp: Vec<u8>) {
        self.pending_offer = Some(sdp);
    }

    pub fn set_pending_answer(&mut self, sdp: Vec<u8>) {
        self.pending_answer = Some(sdp);
    }

    /// Drain and fix up the deferred offer once the media collaborator
    /// reports its transport tuple (spec.md §4.6 "MediaStreamReady").
    pub fn take_offer_ready(&mut self, local_transport: SocketAddr, fixup: &dyn SdpFixup) -> Result<Vec<u8>> {
        let sdp = self
            .pending_offer
            .take()
            .ok_or_else(|| Error::NoPendingOffer(self.id.to_string()))?;
        Ok(fixup.fix_up(&sdp, local_transport))
    }

    pub fn take_answer_ready(&mut self, local_transport: SocketAddr, fixup: &dyn SdpFixup) -> Result<Vec<u8>> {
        let sdp = self
            .pending_answer
            .take()
            .ok_or_else(|| Error::NoPendingOffer(self.id.to_string()))?;
        Ok(fixup.fix_up(&sdp, local_transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvoip_sip_core::types::call_id::CallId;
    use rvoip_sip_core::types::cseq::CSeq;
    use rvoip_sip_core::types::header::{HeaderField, HeaderName, TypedHeader};
    use rvoip_sip_core::types::name_addr::NameAddr;
    use rvoip_sip_core::types::request_line::RequestLine;
    use rvoip_sip_core::types::status::StatusCode;
    use rvoip_sip_core::types::uri::Scheme;

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
        invite.push_header(HeaderField::from_typed(HeaderName::CSeq, TypedHeader::CSeq(CSeq::new(1, Method::Invite))));
        invite
    }

    fn final_2xx(invite: &SipMessage, to_tag: &str, contact_host: &str) -> SipMessage {
        let mut response = crate::request::make_response(invite, StatusCode::OK, None, Some(to_tag));
        response.push_header(HeaderField::from_typed(
            HeaderName::Contact,
            TypedHeader::Contact(NameAddr::new(uri("bob", contact_host))),
        ));
        response
    }

    #[test]
    fn automatic_policy_commits_to_first_2xx_and_byes_the_rest() {
        let invite = sample_invite();
        let mut set = DialogSet::new(DialogSetId::new(), invite.clone(), uri("alice", "pc33.atlanta.com"), ForkPolicy::Automatic);

        let mut first = final_2xx(&invite, "branch-a", "192.0.2.1");
        let actions = set.on_final_response(&mut first).unwrap();
        assert!(matches!(actions.as_slice(), [ForkAction::Deliver(_)]));

        let mut second = final_2xx(&invite, "branch-b", "192.0.2.2");
        let actions = set.on_final_response(&mut second).unwrap();
        assert!(matches!(actions.as_slice(), [ForkAction::SendAck(_), ForkAction::SendBye(_)]));
    }

    #[test]
    fn manual_policy_delivers_every_branch() {
        let invite = sample_invite();
        let mut set = DialogSet::new(DialogSetId::new(), invite.clone(), uri("alice", "pc33.atlanta.com"), ForkPolicy::Manual);

        let mut first = final_2xx(&invite, "branch-a", "192.0.2.1");
        assert!(matches!(set.on_final_response(&mut first).unwrap().as_slice(), [ForkAction::Deliver(_)]));

        let mut second = final_2xx(&invite, "branch-b", "192.0.2.2");
        assert!(matches!(set.on_final_response(&mut second).unwrap().as_slice(), [ForkAction::Deliver(_)]));
    }
}
