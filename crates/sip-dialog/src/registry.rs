use std::collections::HashMap;

use rvoip_sip_core::message::SipMessage;
use rvoip_sip_core::types::header::HeaderName;
use rvoip_sip_core::types::uri::Uri;

use crate::id::DialogSetId;
use crate::key::DialogKey;
use crate::request::typed_call_id;
use crate::request::typed_name_addr;
use crate::set::{DialogSet, ForkPolicy};

/// Owns every live [`DialogSet`] directly in a plain `HashMap` rather
/// than behind a lock or `dashmap` — spec.md §5's single-threaded
/// cooperative scheduler owns the dialog registry the same way
/// `rvoip_sip_transaction::manager::TransactionManager` owns its
/// transaction map, so there is never a second thread to race with.
///
/// Two indices exist because a response and an in-dialog request need
/// different lookups: a response to an INVITE is correlated before any
/// remote tag is known (by `(Call-ID, local tag)`), while an in-dialog
/// request already carries both tags and is routed by the full
/// [`DialogKey`] (spec.md §9 "Cyclic Dialog ↔ Transaction references" —
/// callers hand the registry a key, never a live reference).
#[derive(Debug, Default)]
pub struct DialogRegistry {
    sets: HashMap<DialogSetId, DialogSet>,
    by_local_tag: HashMap<(String, String), DialogSetId>,
    by_dialog_key: HashMap<DialogKey, DialogSetId>,
}

impl DialogRegistry {
    pub fn new() -> Self {
        DialogRegistry::default()
    }

    /// Register a freshly sent UAC INVITE, creating its [`DialogSet`].
    /// `local_tag` is the From-tag already present on `invite` — known
    /// up front, unlike the remote tag.
    pub fn start_invite(&mut self, invite: SipMessage, local_contact: Uri, local_tag: String, policy: ForkPolicy) -> crate::error::Result<DialogSetId> {
        let call_id = typed_call_id(&invite)?;
        let id = DialogSetId::new();
        self.by_local_tag.insert((call_id, local_tag), id);
        self.sets.insert(id, DialogSet::new(id, invite, local_contact, policy));
        Ok(id)
    }

    pub fn set(&self, id: DialogSetId) -> Option<&DialogSet> {
        self.sets.get(&id)
    }

    pub fn set_mut(&mut self, id: DialogSetId) -> Option<&mut DialogSet> {
        self.sets.get_mut(&id)
    }

    /// Resolve the [`DialogSetId`] a 1xx/2xx response to an INVITE
    /// belongs to, by matching its From-tag against the tag the
    /// original INVITE carried (spec.md §4.6).
    pub fn set_for_response(&self, response: &mut SipMessage) -> crate::error::Result<Option<DialogSetId>> {
        let call_id = typed_call_id(response)?;
        let from = typed_name_addr(response, &HeaderName::From, "From")?;
        Ok(from
            .tag()
            .and_then(|tag| self.by_local_tag.get(&(call_id, tag.to_string())))
            .copied())
    }

    /// Record that `key` now resolves to `set`, once enough of the
    /// dialog is known to compute a full [`DialogKey`] (spec.md §9).
    pub fn index_dialog(&mut self, key: DialogKey, set: DialogSetId) {
        self.by_dialog_key.insert(key, set);
    }

    /// Resolve an in-dialog request (To-tag names the local dialog,
    /// From-tag names the peer) to the owning [`DialogSetId`] and the
    /// key it matched, without requiring the caller to have kept a
    /// handle around (spec.md §9).
    pub fn find_for_request(&self, request: &mut SipMessage) -> crate::error::Result<Option<(DialogSetId, DialogKey)>> {
        let Some(to_tag) = typed_name_addr(request, &HeaderName::To, "To")?.tag().map(str::to_string) else {
            return Ok(None);
        };
        let call_id = typed_call_id(request)?;
        let from_tag = typed_name_addr(request, &HeaderName::From, "From")?.tag().map(str::to_string);
        let key = DialogKey::new(call_id, to_tag, from_tag);
        Ok(self.by_dialog_key.get(&key).copied().map(|id| (id, key)))
    }

    /// Drop a [`DialogSet`] and every index entry pointing at it
    /// (terminated dialogs, or a completed non-forking call).
    pub fn remove(&mut self, id: DialogSetId) {
        self.sets.remove(&id);
        self.by_local_tag.retain(|_, v| *v != id);
        self.by_dialog_key.retain(|_, v| *v != id);
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvoip_sip_core::types::call_id::CallId;
    use rvoip_sip_core::types::cseq::CSeq;
    use rvoip_sip_core::types::header::{HeaderField, TypedHeader};
    use rvoip_sip_core::types::method::Method;
    use rvoip_sip_core::types::name_addr::NameAddr;
    use rvoip_sip_core::types::request_line::RequestLine;
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

    #[test]
    fn set_for_response_matches_by_call_id_and_local_tag() {
        let invite = sample_invite();
        let mut registry = DialogRegistry::new();
        let id = registry
            .start_invite(invite.clone(), uri("alice", "pc33.atlanta.com"), "1928301774".to_string(), ForkPolicy::Automatic)
            .unwrap();

        let mut response = crate::request::make_response(&invite, rvoip_sip_core::types::status::StatusCode::RINGING, None, Some("peer-tag"));
        assert_eq!(registry.set_for_response(&mut response).unwrap(), Some(id));
    }

    #[test]
    fn remove_clears_every_index() {
        let invite = sample_invite();
        let mut registry = DialogRegistry::new();
        let id = registry
            .start_invite(invite, uri("alice", "pc33.atlanta.com"), "1928301774".to_string(), ForkPolicy::Automatic)
            .unwrap();
        registry.index_dialog(DialogKey::new("call", "local", Some("remote".to_string())), id);
        registry.remove(id);
        assert!(registry.is_empty());
        assert!(registry.find_for_request(&mut sample_invite()).unwrap().is_none());
    }
}
