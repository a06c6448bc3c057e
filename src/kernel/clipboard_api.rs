//! Clipboard calls with raw window and format ids.
//!
//! A window id of 0 means "no window" and a data handle of 0 means "no
//! data"; both map to `None` on the coordinator side.

use ek_core::clipboard::FormatId;
use ek_core::ids::{GlobalHandle, Hwnd};

use super::Kernel;

impl Kernel {
    /// `OpenClipboard`. The null window cannot open the clipboard.
    pub fn open_clipboard(&mut self, hwnd: u32) -> bool {
        Hwnd::new(hwnd).is_some_and(|hwnd| self.clipboard.open(hwnd))
    }

    pub fn close_clipboard(&mut self) -> bool {
        self.clipboard.close()
    }

    pub fn empty_clipboard(&mut self) -> bool {
        self.clipboard.empty()
    }

    /// `SetClipboardData`. Data 0 promises the format for later rendering.
    pub fn set_clipboard_data(&mut self, format: FormatId, data: u16) -> u16 {
        GlobalHandle::raw_or_null(self.clipboard.set_data(format, GlobalHandle::new(data)))
    }

    pub fn get_clipboard_data(&mut self, format: FormatId) -> u16 {
        GlobalHandle::raw_or_null(self.clipboard.get_data(format))
    }

    pub fn register_clipboard_format(&mut self, name: &str) -> FormatId {
        self.clipboard.register_format(name)
    }

    pub fn get_clipboard_format_name(&self, format: FormatId) -> Option<String> {
        self.clipboard.format_name(format).map(str::to_string)
    }

    pub fn count_clipboard_formats(&mut self) -> usize {
        self.clipboard.count_formats()
    }

    pub fn enum_clipboard_formats(&mut self, after: FormatId) -> FormatId {
        self.clipboard.enum_formats(after)
    }

    pub fn is_clipboard_format_available(&mut self, format: FormatId) -> bool {
        self.clipboard.is_format_available(format)
    }

    /// `SetClipboardViewer`: previous head of the viewer chain.
    pub fn set_clipboard_viewer(&mut self, hwnd: u32) -> u32 {
        Hwnd::raw_or_null(self.clipboard.set_viewer(Hwnd::new(hwnd)))
    }

    pub fn get_clipboard_viewer(&self) -> u32 {
        Hwnd::raw_or_null(self.clipboard.viewer())
    }

    pub fn change_clipboard_chain(&mut self, removed: u32, next: u32) -> bool {
        let Some(removed) = Hwnd::new(removed) else {
            return false;
        };
        self.clipboard.change_chain(removed, Hwnd::new(next))
    }

    pub fn get_clipboard_owner(&self) -> u32 {
        Hwnd::raw_or_null(self.clipboard.owner())
    }

    pub fn get_open_clipboard_window(&self) -> u32 {
        Hwnd::raw_or_null(self.clipboard.open_window())
    }
}
