use serde::{Deserialize, Serialize};

use super::format::FormatId;
use crate::ids::Hwnd;

/// Notifications the coordinator sends to clipboard owners and viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipboardMessage {
    /// `WM_DESTROYCLIPBOARD`: the owner loses ownership, free private data.
    DestroyClipboard,
    /// `WM_RENDERFORMAT`: call `set_data` for this promised format now.
    RenderFormat(FormatId),
    /// `WM_RENDERALLFORMATS`: the owner is going away, render everything.
    RenderAllFormats,
    /// `WM_DRAWCLIPBOARD`: clipboard contents changed.
    DrawClipboard,
    /// `WM_CHANGECBCHAIN`: `removed` leaves the viewer chain, `next` follows it.
    ChangeCbChain {
        removed: Hwnd,
        next: Option<Hwnd>,
    },
}

impl ClipboardMessage {
    pub fn code(&self) -> u16 {
        match self {
            ClipboardMessage::DestroyClipboard => 0x0307,
            ClipboardMessage::RenderFormat(_) => 0x0305,
            ClipboardMessage::RenderAllFormats => 0x0306,
            ClipboardMessage::DrawClipboard => 0x0308,
            ClipboardMessage::ChangeCbChain { .. } => 0x030D,
        }
    }
}
