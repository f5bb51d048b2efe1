use std::fmt;

/// A dialog's lifecycle (spec.md §4.6, RFC 3261 §12): created Early from
/// a 1xx-with-tag or a dialog-establishing request, Confirmed on a 2xx
/// or the matching ACK, Terminated on BYE or local cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogState {
    Early,
    Confirmed,
    Terminated,
}

impl DialogState {
    pub fn is_early(self) -> bool {
        matches!(self, DialogState::Early)
    }

    pub fn is_confirmed(self) -> bool {
        matches!(self, DialogState::Confirmed)
    }

    pub fn is_terminated(self) -> bool {
        matches!(self, DialogState::Terminated)
    }
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialogState::Early => "early",
            DialogState::Confirmed => "confirmed",
            DialogState::Terminated => "terminated",
        })
    }
}
