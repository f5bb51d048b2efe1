use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::RngCore;
use uuid::Uuid;

use rvoip_sip_core::message::SipMessage;
use rvoip_sip_core::types::call_id::CallId;
use rvoip_sip_core::types::cseq::CSeq;
use rvoip_sip_core::types::header::{HeaderField, HeaderName, TypedHeader};
use rvoip_sip_core::types::integer::IntegerCategory;
use rvoip_sip_core::types::method::Method;
use rvoip_sip_core::types::mime::Mime;
use rvoip_sip_core::types::name_addr::NameAddr;
use rvoip_sip_core::types::request_line::RequestLine;
use rvoip_sip_core::types::status::StatusCode;
use rvoip_sip_core::types::token::Token;
use rvoip_sip_core::types::uri::Uri;
use rvoip_sip_core::types::via::Via;

use rvoip_sip_dialog::dialog::Dialog;
use rvoip_sip_dialog::id::DialogSetId;
use rvoip_sip_dialog::request as dialog_request;
use rvoip_sip_dialog::set::{ForkAction, ForkPolicy};
use rvoip_sip_transaction::event::TransactionEvent;
use rvoip_sip_transaction::key::TransactionKey;

use crate::error::{Error, Result};
use crate::executive::Executive;
use crate::pidf::Pidf;

/// Whether an instant message carried a recognised signature. S/MIME
/// signing itself is out of scope (SPEC_FULL.md Non-goals); this only
/// leaves room for a caller that does carry one to say so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    None,
    Unverifiable,
}

/// The TU callbacks spec.md §6 lists against the resiprocate `TuIM`
/// convenience layer: `receivedPage`, `sendPageFailed`, `presenceUpdate`.
/// A caller implements this instead of pattern-matching raw
/// [`TransactionEvent`]s directly.
pub trait TuImCallbacks: Send {
    fn received_page(&mut self, text: &str, from: &NameAddr, sig_status: SignatureStatus, encrypted: bool);
    fn send_page_failed(&mut self, dest: &Uri);
    fn presence_update(&mut self, from: &NameAddr, open: bool, note: Option<&str>);
}

struct RegistrationState {
    registrar: Uri,
    key: TransactionKey,
    call_id: String,
    from_tag: String,
    cseq: u32,
    expires: u32,
    registered: bool,
    refresh_at: Instant,
}

struct Buddy {
    target: NameAddr,
    set: DialogSetId,
    key: TransactionKey,
    call_id: String,
    from_tag: String,
    cseq: u32,
    expires: u32,
    confirmed: bool,
    refresh_at: Instant,
    presence: Option<Pidf>,
}

/// A buddy-list/instant-message convenience layer over [`Executive`]
/// (SPEC_FULL.md §4 "supplemented feature", grounded on the original's
/// `TuIM`): owns one AOR's registration, its outgoing SUBSCRIBEs to
/// other AORs ("buddies"), the incoming SUBSCRIBEs it answers
/// ("subscribers"), and MESSAGE send/receive — everything spec.md §6's
/// TU callback list needs a driver for.
///
/// `rvoip_sip_dialog::request`'s tag/branch/skeleton helpers are
/// `pub(crate)` to that crate, so the handful this module needs (branch,
/// tag, Call-ID, MESSAGE templating) are re-implemented here in the same
/// idiom rather than exposed.
pub struct TuIM {
    executive: Executive,
    aor: NameAddr,
    local_contact: Uri,
    registration: Option<RegistrationState>,
    buddies: HashMap<String, Buddy>,
    subscribers: HashMap<String, Dialog>,
    pending_pages: HashMap<TransactionKey, NameAddr>,
    my_presence: Pidf,
    callbacks: Box<dyn TuImCallbacks>,
}

impl TuIM {
    pub fn new(executive: Executive, aor: NameAddr, local_contact: Uri, callbacks: Box<dyn TuImCallbacks>) -> Self {
        let presence = Pidf::new(aor.uri.to_string(), true);
        TuIM {
            executive,
            aor,
            local_contact,
            registration: None,
            buddies: HashMap::new(),
            subscribers: HashMap::new(),
            pending_pages: HashMap::new(),
            my_presence: presence,
            callbacks,
        }
    }

    pub fn executive(&self) -> &Executive {
        &self.executive
    }

    pub fn executive_mut(&mut self) -> &mut Executive {
        &mut self.executive
    }

    /// Update this AOR's own presence document; the next NOTIFY sent to
    /// any subscriber (on refresh or state change) carries it.
    pub fn set_presence(&mut self, open: bool, note: Option<String>) {
        self.my_presence.open = open;
        self.my_presence.note = note;
    }

    pub async fn register_aor(&mut self, registrar: Uri, expires: u32) -> Result<TransactionKey> {
        let register = dialog_request::make_initial_register(registrar.clone(), self.aor.clone(), self.local_contact.clone(), expires);
        let call_id = call_id_of(&register).ok_or_else(|| Error::ProtocolViolation("built REGISTER carries no Call-ID".into()))?;
        let from_tag = from_tag_of(&register).ok_or_else(|| Error::ProtocolViolation("built REGISTER carries no From-tag".into()))?;
        let key = self.executive.send_request(register).await?;
        self.registration = Some(RegistrationState {
            registrar,
            key: key.clone(),
            call_id,
            from_tag,
            cseq: 1,
            expires,
            registered: false,
            refresh_at: Instant::now() + Duration::from_secs(expires as u64),
        });
        Ok(key)
    }

    async fn refresh_registration(&mut self) -> Result<()> {
        let Some(reg) = self.registration.as_ref() else { return Ok(()) };
        let registrar = reg.registrar.clone();
        let call_id = reg.call_id.clone();
        let from_tag = reg.from_tag.clone();
        let expires = reg.expires;
        let cseq = reg.cseq + 1;

        let refreshed = rebuild_with_identity(
            dialog_request::make_initial_register(registrar, self.aor.clone(), self.local_contact.clone(), expires),
            &call_id,
            &from_tag,
            cseq,
            Method::Register,
        );
        let key = self.executive.send_request(refreshed).await?;
        if let Some(reg) = self.registration.as_mut() {
            reg.cseq = cseq;
            reg.key = key;
            reg.refresh_at = Instant::now() + Duration::from_secs((expires as u64 * 9) / 10);
        }
        Ok(())
    }

    /// Send a MESSAGE (RFC 3428) to `dest` out of dialog. Failure is
    /// reported later, asynchronously, via [`TuImCallbacks::send_page_failed`]
    /// once the transaction reaches a non-2xx final response.
    pub async fn send_page(&mut self, text: &str, dest: NameAddr) -> Result<TransactionKey> {
        let request = build_message(&dest, &self.aor, &self.local_contact, text);
        let key = self.executive.send_request(request).await?;
        self.pending_pages.insert(key.clone(), dest);
        Ok(key)
    }

    /// Subscribe to `target`'s presence (RFC 6665). The dialog this
    /// creates is tracked exactly like an INVITE's — a single-member
    /// [`rvoip_sip_dialog::set::DialogSet`] under [`ForkPolicy::Automatic`],
    /// since a SUBSCRIBE never legitimately forks to more than one
    /// answering UAS.
    pub async fn add_buddy(&mut self, target: NameAddr, expires: u32) -> Result<()> {
        let subscribe = dialog_request::make_initial_subscribe(target.clone(), self.aor.clone(), self.local_contact.clone(), "presence", expires);
        let call_id = call_id_of(&subscribe).ok_or_else(|| Error::ProtocolViolation("built SUBSCRIBE carries no Call-ID".into()))?;
        let from_tag = from_tag_of(&subscribe).ok_or_else(|| Error::ProtocolViolation("built SUBSCRIBE carries no From-tag".into()))?;

        let set_id = self
            .executive
            .dialogs_mut()
            .start_invite(subscribe.clone(), self.local_contact.clone(), from_tag.clone(), ForkPolicy::Automatic)?;
        let key = self.executive.send_request(subscribe).await?;

        self.buddies.insert(
            target.uri.to_string(),
            Buddy {
                target,
                set: set_id,
                key,
                call_id,
                from_tag,
                cseq: 1,
                expires,
                confirmed: false,
                refresh_at: Instant::now() + Duration::from_secs(expires as u64),
                presence: None,
            },
        );
        Ok(())
    }

    /// Unsubscribe from a buddy's presence: sends `Expires: 0` and drops
    /// the local dialog immediately rather than waiting for a NOTIFY
    /// confirming the teardown.
    pub async fn remove_buddy(&mut self, target_uri: &str) -> Result<()> {
        let Some(buddy) = self.buddies.remove(target_uri) else {
            return Ok(());
        };
        if buddy.confirmed {
            let dialog = self
                .executive
                .dialogs_mut()
                .set_mut(buddy.set)
                .and_then(|set| set.dialogs().find(|d| d.remote_tag.is_some()).cloned());
            if let Some(mut dialog) = dialog {
                let unsubscribe = dialog.make_request(Method::Subscribe, self.local_contact.clone());
                let unsubscribe = set_expires(unsubscribe, 0);
                let _ = self.executive.send_request(unsubscribe).await;
            }
        }
        self.executive.dialogs_mut().remove(buddy.set);
        Ok(())
    }

    async fn refresh_buddy(&mut self, target_uri: &str) -> Result<()> {
        let Some(buddy) = self.buddies.get(target_uri) else { return Ok(()) };
        let target = buddy.target.clone();
        let call_id = buddy.call_id.clone();
        let from_tag = buddy.from_tag.clone();
        let expires = buddy.expires;
        let cseq = buddy.cseq + 1;

        let refreshed = rebuild_with_identity(
            dialog_request::make_initial_subscribe(target, self.aor.clone(), self.local_contact.clone(), "presence", expires),
            &call_id,
            &from_tag,
            cseq,
            Method::Subscribe,
        );
        let key = self.executive.send_request(refreshed).await?;
        if let Some(buddy) = self.buddies.get_mut(target_uri) {
            buddy.cseq = cseq;
            buddy.key = key;
            buddy.refresh_at = Instant::now() + Duration::from_secs((expires as u64 * 9) / 10);
        }
        Ok(())
    }

    /// Refresh the registration and any buddy subscription within ~10%
    /// of expiring (spec.md §8 S6 "SUBSCRIBE refresh"). Call this
    /// periodically from whatever drives the TU's event loop.
    pub async fn tick(&mut self) -> Result<()> {
        let now = Instant::now();
        if matches!(&self.registration, Some(reg) if reg.registered && now >= reg.refresh_at) {
            self.refresh_registration().await?;
        }
        let due: Vec<String> = self
            .buddies
            .iter()
            .filter(|(_, b)| b.confirmed && now >= b.refresh_at)
            .map(|(aor, _)| aor.clone())
            .collect();
        for aor in due {
            self.refresh_buddy(&aor).await?;
        }
        Ok(())
    }

    /// Block for, and dispatch, the next stack event. Returns `Ok(false)`
    /// once the underlying transport has shut down.
    pub async fn drive_one(&mut self) -> Result<bool> {
        match self.executive.receive().await {
            Some(event) => {
                self.handle_event(event).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn handle_event(&mut self, event: TransactionEvent) -> Result<()> {
        match event {
            TransactionEvent::Request { key, request } => self.handle_request(key, request).await,
            TransactionEvent::Final { key, response } => self.handle_final(key, response).await,
            TransactionEvent::TimedOut { key, response } => self.handle_final(key, response).await,
            TransactionEvent::TransportFailed { key, response } => self.handle_final(key, response).await,
            TransactionEvent::Provisional { key, .. } => {
                tracing::trace!(%key, "provisional response, nothing for TuIM to do");
                Ok(())
            }
            TransactionEvent::Terminated { key } => {
                tracing::debug!(%key, "transaction terminated");
                Ok(())
            }
            TransactionEvent::StrayResponse { key, .. } => {
                tracing::debug!(%key, "stray response delivered under StrayResponsePolicy::Deliver, TuIM has no tracked transaction for it");
                Ok(())
            }
        }
    }

    async fn handle_request(&mut self, key: TransactionKey, mut request: SipMessage) -> Result<()> {
        let method = request.request_line().map(|rl| rl.method.clone()).unwrap_or(Method::Unknown(String::new()));
        match method {
            Method::Message => self.handle_incoming_message(key, &request).await,
            Method::Subscribe => self.handle_incoming_subscribe(key, &mut request).await,
            Method::Notify => self.handle_incoming_notify(key, &mut request).await,
            Method::Bye => self.handle_incoming_bye(key, &mut request).await,
            _ => {
                let response = dialog_request::make_response(&request, StatusCode(405), Some("Method Not Allowed"), None);
                self.executive.send_response(&key, response).await
            }
        }
    }

    async fn handle_incoming_message(&mut self, key: TransactionKey, request: &SipMessage) -> Result<()> {
        let from = header_name_addr(request, &HeaderName::From).ok_or_else(|| Error::ProtocolViolation("MESSAGE carries no From".into()))?;
        let text = String::from_utf8_lossy(&request.body).into_owned();
        self.callbacks.received_page(&text, &from, SignatureStatus::None, false);
        let response = dialog_request::make_response(request, StatusCode::OK, None, None);
        self.executive.send_response(&key, response).await
    }

    async fn handle_incoming_subscribe(&mut self, key: TransactionKey, request: &mut SipMessage) -> Result<()> {
        let expires = header_integer(request, &HeaderName::Expires).unwrap_or(3600);
        let call_id = call_id_of(request).ok_or_else(|| Error::ProtocolViolation("SUBSCRIBE carries no Call-ID".into()))?;

        let mut dialog = match self.subscribers.get(&call_id) {
            Some(existing) => existing.clone(),
            None => {
                let local_tag = generate_tag();
                Dialog::from_uas_request(request, local_tag)?
            }
        };
        dialog.update_remote_sequence(request)?;

        let response = dialog.make_response(request, StatusCode::OK, None);
        let response = set_expires(response, expires);
        self.executive.send_response(&key, response).await?;

        let notify = dialog.make_request(Method::Notify, self.local_contact.clone());
        let mut notify = set_subscription_state(notify, expires);
        notify.set_contents(Pidf::mime(), self.my_presence.to_xml().into_bytes());
        self.subscribers.insert(call_id, dialog);
        self.executive.send_request(notify).await?;
        Ok(())
    }

    async fn handle_incoming_notify(&mut self, key: TransactionKey, request: &mut SipMessage) -> Result<()> {
        let Some((set_id, dialog_key)) = self.executive.dialogs_mut().find_for_request(request)? else {
            let response = dialog_request::make_response(request, StatusCode(481), Some("Call/Transaction Does Not Exist"), None);
            return self.executive.send_response(&key, response).await;
        };
        let Some(remote_tag) = dialog_key.remote_tag.clone() else {
            let response = dialog_request::make_response(request, StatusCode(481), Some("Call/Transaction Does Not Exist"), None);
            return self.executive.send_response(&key, response).await;
        };

        let (local_tag_response, pidf) = {
            let Some(set) = self.executive.dialogs_mut().set_mut(set_id) else {
                let response = dialog_request::make_response(request, StatusCode(481), Some("Call/Transaction Does Not Exist"), None);
                return self.executive.send_response(&key, response).await;
            };
            let Some(dialog) = set.get_mut_by_remote_tag(&remote_tag) else {
                let response = dialog_request::make_response(request, StatusCode(481), Some("Call/Transaction Does Not Exist"), None);
                return self.executive.send_response(&key, response).await;
            };
            dialog.update_remote_sequence(request)?;
            let response = dialog.make_response(request, StatusCode::OK, None);
            let pidf = Pidf::parse(&request.body).ok();
            (response, pidf)
        };

        self.executive.send_response(&key, local_tag_response).await?;

        if let Some(pidf) = pidf {
            if let Some(buddy) = self.buddies.values_mut().find(|b| b.set == set_id) {
                buddy.presence = Some(pidf.clone());
            }
            let from = header_name_addr(request, &HeaderName::From).unwrap_or_else(|| self.aor.clone());
            self.callbacks.presence_update(&from, pidf.open, pidf.note.as_deref());
        }
        Ok(())
    }

    async fn handle_incoming_bye(&mut self, key: TransactionKey, request: &mut SipMessage) -> Result<()> {
        let call_id = call_id_of(request).unwrap_or_default();
        if let Some(mut dialog) = self.subscribers.remove(&call_id) {
            dialog.update_remote_sequence(request)?;
            let response = dialog.make_response(request, StatusCode::OK, None);
            return self.executive.send_response(&key, response).await;
        }

        if let Some((set_id, dialog_key)) = self.executive.dialogs_mut().find_for_request(request)? {
            if let Some(remote_tag) = dialog_key.remote_tag.clone() {
                let response = {
                    let Some(set) = self.executive.dialogs_mut().set_mut(set_id) else {
                        return self.respond_481(key, request).await;
                    };
                    let Some(dialog) = set.get_mut_by_remote_tag(&remote_tag) else {
                        return self.respond_481(key, request).await;
                    };
                    dialog.update_remote_sequence(request)?;
                    dialog.terminate();
                    dialog.make_response(request, StatusCode::OK, None)
                };
                self.executive.dialogs_mut().remove(set_id);
                return self.executive.send_response(&key, response).await;
            }
        }
        self.respond_481(key, request).await
    }

    async fn respond_481(&mut self, key: TransactionKey, request: &SipMessage) -> Result<()> {
        let response = dialog_request::make_response(request, StatusCode(481), Some("Call/Transaction Does Not Exist"), None);
        self.executive.send_response(&key, response).await
    }

    async fn handle_final(&mut self, key: TransactionKey, mut response: SipMessage) -> Result<()> {
        if matches!(&self.registration, Some(reg) if reg.key == key) {
            let success = response.status_line().map(|s| s.status_code.is_success()).unwrap_or(false);
            if let Some(reg) = self.registration.as_mut() {
                reg.registered = success;
                if success {
                    reg.refresh_at = Instant::now() + Duration::from_secs((reg.expires as u64 * 9) / 10);
                }
            }
            return Ok(());
        }

        if let Some(dest) = self.pending_pages.remove(&key) {
            let success = response.status_line().map(|s| s.status_code.is_success()).unwrap_or(false);
            if !success {
                self.callbacks.send_page_failed(&dest.uri);
            }
            return Ok(());
        }

        let buddy_aor = self.buddies.iter().find(|(_, b)| b.key == key).map(|(aor, _)| aor.clone());
        if let Some(aor) = buddy_aor {
            return self.handle_buddy_final(&aor, &mut response).await;
        }

        tracing::debug!(%key, "final response matched no TuIM-tracked transaction");
        Ok(())
    }

    async fn handle_buddy_final(&mut self, aor: &str, response: &mut SipMessage) -> Result<()> {
        let Some(set_id) = self.buddies.get(aor).map(|b| b.set) else { return Ok(()) };
        let actions = {
            let Some(set) = self.executive.dialogs_mut().set_mut(set_id) else { return Ok(()) };
            set.on_final_response(response)?
        };
        for action in actions {
            match action {
                ForkAction::Deliver(id) => {
                    let key = self.executive.dialogs_mut().set_mut(set_id).and_then(|set| set.get(id)).and_then(|d| d.key());
                    if let Some(buddy) = self.buddies.get_mut(aor) {
                        buddy.confirmed = true;
                        buddy.refresh_at = Instant::now() + Duration::from_secs((buddy.expires as u64 * 9) / 10);
                    }
                    if let Some(key) = key {
                        self.executive.dialogs_mut().index_dialog(key, set_id);
                    }
                }
                ForkAction::SendAck(ack) => {
                    let _ = self.executive.send_request(ack).await;
                }
                ForkAction::SendBye(bye) => {
                    let _ = self.executive.send_request(bye).await;
                }
            }
        }
        Ok(())
    }
}

/// `z9hG4bK`-prefixed per RFC 3261 §8.1.1.7 — same shape
/// `rvoip_sip_dialog::request::generate_branch` produces, reimplemented
/// locally since that one is private to its own crate.
fn generate_branch() -> String {
    let mut bytes = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut out = String::from("z9hG4bK");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn generate_tag() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn generate_call_id() -> String {
    Uuid::new_v4().to_string()
}

fn call_id_of(msg: &SipMessage) -> Option<String> {
    let mut field = msg.header(&HeaderName::CallId).cloned()?;
    match field.typed().ok()?.clone() {
        TypedHeader::CallId(id) => Some(id.0),
        _ => None,
    }
}

fn from_tag_of(msg: &SipMessage) -> Option<String> {
    header_name_addr(msg, &HeaderName::From)?.tag().map(str::to_string)
}

fn header_name_addr(msg: &SipMessage, name: &HeaderName) -> Option<NameAddr> {
    let mut field = msg.header(name).cloned()?;
    match field.typed().ok()?.clone() {
        TypedHeader::From(na) | TypedHeader::To(na) | TypedHeader::Contact(na) | TypedHeader::Route(na) | TypedHeader::RecordRoute(na) => Some(na),
        _ => None,
    }
}

fn header_integer(msg: &SipMessage, name: &HeaderName) -> Option<u32> {
    let mut field = msg.header(name).cloned()?;
    match field.typed().ok()?.clone() {
        TypedHeader::Expires(v) | TypedHeader::ContentLength(v) | TypedHeader::MaxForwards(v) => Some(v.value),
        _ => None,
    }
}

/// Rewrite the dialog-identity fields of a freshly-templated refresh
/// request (Call-ID, From-tag, CSeq) to match the registration/buddy
/// state being refreshed, while keeping the fresh Via branch the
/// template just generated (a refresh is still its own transaction).
fn rebuild_with_identity(mut msg: SipMessage, call_id: &str, from_tag: &str, cseq: u32, method: Method) -> SipMessage {
    if let Some(field) = msg.header_mut(&HeaderName::CallId) {
        field.set_typed(TypedHeader::CallId(CallId::new(call_id.to_string())));
    }
    if let Some(field) = msg.header_mut(&HeaderName::From) {
        if let Ok(TypedHeader::From(mut na)) = field.typed().cloned() {
            na.set_tag(from_tag.to_string());
            field.set_typed(TypedHeader::From(na));
        }
    }
    if let Some(field) = msg.header_mut(&HeaderName::CSeq) {
        field.set_typed(TypedHeader::CSeq(CSeq::new(cseq, method)));
    }
    msg
}

fn set_expires(mut msg: SipMessage, expires: u32) -> SipMessage {
    msg.remove_headers(&HeaderName::Expires);
    msg.push_header(HeaderField::from_typed(HeaderName::Expires, TypedHeader::Expires(IntegerCategory::new(expires))));
    msg
}

fn set_subscription_state(mut msg: SipMessage, expires: u32) -> SipMessage {
    let mut token = if expires > 0 { Token::new("active") } else { Token::new("terminated") };
    if expires > 0 {
        token.params.set("expires", Some(expires.to_string()));
    } else {
        token.params.set("reason", Some("timeout".to_string()));
    }
    msg.push_header(HeaderField::from_typed(HeaderName::SubscriptionState, TypedHeader::SubscriptionState(token)));
    msg
}

/// `makeOutOfDialogMessage` (SPEC_FULL.md §4): a MESSAGE request is
/// never dialog-forming, so it gets its own minimal skeleton rather than
/// reusing [`Dialog::make_request`].
fn build_message(to: &NameAddr, from_aor: &NameAddr, local_contact: &Uri, text: &str) -> SipMessage {
    let mut request = SipMessage::new_request(RequestLine::new(Method::Message, to.uri.clone()));

    let mut via = Via::new(local_contact.transport().unwrap_or("UDP").to_ascii_uppercase(), local_contact.host.clone());
    via.sent_host_is_ipv6_literal = local_contact.host_is_ipv6_literal;
    via.sent_port = local_contact.port;
    via.set_branch(generate_branch());
    request.push_header(HeaderField::from_typed(HeaderName::Via, TypedHeader::Via(via)));

    let mut from = from_aor.clone();
    from.set_tag(generate_tag());
    request.push_header(HeaderField::from_typed(HeaderName::From, TypedHeader::From(from)));
    request.push_header(HeaderField::from_typed(HeaderName::To, TypedHeader::To(to.clone())));
    request.push_header(HeaderField::from_typed(HeaderName::CallId, TypedHeader::CallId(CallId::new(generate_call_id()))));
    request.push_header(HeaderField::from_typed(HeaderName::CSeq, TypedHeader::CSeq(CSeq::new(1, Method::Message))));
    request.push_header(HeaderField::from_typed(HeaderName::Contact, TypedHeader::Contact(NameAddr::new(local_contact.clone()))));
    request.push_header(HeaderField::from_typed(
        HeaderName::MaxForwards,
        TypedHeader::MaxForwards(IntegerCategory::new(70)),
    ));
    request.set_contents(Mime::new("text", "plain"), text.as_bytes().to_vec());
    request
}
