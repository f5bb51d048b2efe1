use std::fmt;

use uuid::Uuid;

/// An opaque handle to a [`crate::dialog::Dialog`] (spec.md §9 "Forking
/// ownership": the [`crate::set::DialogSet`] is the single owner of its
/// dialogs; external callers hold only this integer-like handle,
/// validated against the registry on every call rather than dereferenced
/// directly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialogId(Uuid);

impl DialogId {
    pub fn new() -> Self {
        DialogId(Uuid::new_v4())
    }
}

impl Default for DialogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque handle to a [`crate::set::DialogSet`], one per UAC INVITE
/// that may fork (spec.md §4.6 "when a UAC INVITE is sent, a DialogSet
/// is created").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialogSetId(Uuid);

impl DialogSetId {
    pub fn new() -> Self {
        DialogSetId(Uuid::new_v4())
    }
}

impl Default for DialogSetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DialogSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
