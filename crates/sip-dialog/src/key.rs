use std::fmt;

/// RFC 3261 §12.1 dialog identification: `(Call-ID, localTag, remoteTag)`
/// (spec.md §4.6). Unlike [`crate::id::DialogId`] this is not opaque — a
/// registry uses it to route an inbound in-dialog request or response to
/// the right [`crate::dialog::Dialog`] without the caller needing to
/// carry a handle around.
///
/// A dialog is "early" until the remote tag is known; an early dialog's
/// key carries `remote_tag: None` and stops matching once the peer tag is
/// learned from the first 1xx/2xx (see [`crate::dialog::Dialog::confirm_with_tag`]
/// / `set_remote_tag`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DialogKey {
    pub call_id: String,
    pub local_tag: String,
    pub remote_tag: Option<String>,
}

impl DialogKey {
    pub fn new(call_id: impl Into<String>, local_tag: impl Into<String>, remote_tag: Option<String>) -> Self {
        DialogKey { call_id: call_id.into(), local_tag: local_tag.into(), remote_tag }
    }
}

impl fmt::Display for DialogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.call_id, self.local_tag, self.remote_tag.as_deref().unwrap_or("-"))
    }
}
