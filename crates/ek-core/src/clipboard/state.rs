use serde::{Deserialize, Serialize};

use crate::ids::{Hwnd, NativeWindow};
use crate::ports::SelectionToken;

/// Ownership and locking state of the clipboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardState {
    pub owner: Option<Hwnd>,
    /// Window that has the clipboard open; `None` means closed.
    pub opener: Option<Hwnd>,
    /// Head of the viewer chain.
    pub viewer: Option<Hwnd>,
    pub changed: bool,
}

impl ClipboardState {
    pub fn is_open(&self) -> bool {
        self.opener.is_some()
    }
}

/// What the coordinator knows about the host selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionMirror {
    pub acquired: bool,
    /// Native window holding the selection for us.
    pub window: Option<NativeWindow>,
    /// Holder before the last hand-over, kept until the host confirms the
    /// loss.
    pub previous: Option<NativeWindow>,
    /// Outstanding conversion request.
    pub pending: Option<SelectionToken>,
}
