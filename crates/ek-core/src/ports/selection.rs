use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::NativeWindow;

/// Correlates a conversion request with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionToken(u64);

impl SelectionToken {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SelectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Event unrelated to the selection that arrived on the same connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignEvent {
    pub window: Option<NativeWindow>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Reply to `convert_selection`. `data` is `None` when the owner refused
    /// or nobody owned the selection.
    SelectionNotify {
        requestor: NativeWindow,
        token: SelectionToken,
        data: Option<Vec<u8>>,
    },
    /// `window` no longer owns the selection.
    SelectionClear { window: NativeWindow },
    Foreign(ForeignEvent),
}

/// Single-owner selection protocol of the host windowing system.
pub trait SelectionPort: Send + Sync {
    /// Claim the selection for `window`, or release it with `None`. The claim
    /// may silently fail; check with [`SelectionPort::owner`].
    fn set_owner(&self, window: Option<NativeWindow>);

    fn owner(&self) -> Option<NativeWindow>;

    /// Ask the current owner for its text. The answer arrives later as a
    /// [`SelectionEvent::SelectionNotify`] carrying `token`.
    fn convert_selection(&self, requestor: NativeWindow, token: SelectionToken);

    /// Next event for this connection, `None` once no further event can
    /// arrive.
    fn next_event(&self) -> Option<SelectionEvent>;
}

#[cfg(test)]
mockall::mock! {
    pub Selection {}

    impl SelectionPort for Selection {
        fn set_owner(&self, window: Option<NativeWindow>);
        fn owner(&self) -> Option<NativeWindow>;
        fn convert_selection(&self, requestor: NativeWindow, token: SelectionToken);
        fn next_event(&self) -> Option<SelectionEvent>;
    }
}
