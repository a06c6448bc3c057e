//! Bridge between the text formats and the host's single-owner selection.
//!
//! Reading the host selection is asynchronous on the host side but
//! synchronous for callers. [`ClipboardCoordinator::request_external_selection`]
//! therefore issues a token-tagged conversion request and pumps the
//! selection connection until the matching reply arrives. Everything else
//! that arrives meanwhile is dispatched from inside that wait and can
//! re-enter the coordinator.

use std::iter;

use super::coordinator::ClipboardCoordinator;
use super::format::{CF_OEMTEXT, CF_TEXT};
use crate::ids::{GlobalHandle, Hwnd, NativeWindow};
use crate::ports::{ForeignEvent, SelectionEvent, SelectionToken};

/// Bound on parent walks in a corrupted window tree.
const MAX_WINDOW_DEPTH: usize = 256;

impl ClipboardCoordinator {
    /// Native window of `hwnd` or of its closest ancestor that has one.
    fn resolve_native(&self, hwnd: Hwnd) -> Option<NativeWindow> {
        let windows = &self.ports.windows;
        iter::successors(Some(hwnd), |current| windows.parent(*current))
            .take(MAX_WINDOW_DEPTH)
            .find_map(|current| windows.native_window(current))
    }

    /// Try to take the host selection through the opener's native window.
    pub(super) fn claim_selection(&mut self) {
        let Some(window) = self.state.opener.and_then(|opener| self.resolve_native(opener)) else {
            tracing::debug!(opener = ?self.state.opener, "no native window to claim the selection with");
            return;
        };
        self.ports.selection.set_owner(Some(window));
        if self.ports.selection.owner() == Some(window) {
            self.selection.acquired = true;
            self.selection.window = Some(window);
            tracing::debug!(%window, "grabbed host selection");
        } else {
            tracing::debug!(%window, "host refused selection ownership");
        }
    }

    pub(super) fn give_up_selection(&mut self) {
        if !self.selection.acquired {
            return;
        }
        self.selection.acquired = false;
        self.selection.previous = self.selection.window.take();
        tracing::debug!(previous = ?self.selection.previous, "giving up host selection");
        self.ports.selection.set_owner(None);
    }

    /// Fetch the host selection as OEM text, waiting for the owner's reply.
    ///
    /// Returns whether OEM text is present afterwards. The wait ends early,
    /// returning the current state, if the connection stops delivering
    /// events.
    pub fn request_external_selection(&mut self) -> bool {
        let Some(hwnd) = self
            .state
            .opener
            .or_else(|| self.ports.windows.active_window())
        else {
            return false;
        };
        let Some(requestor) = self.resolve_native(hwnd) else {
            tracing::debug!(%hwnd, "no native window to request the selection with");
            return false;
        };

        self.next_token += 1;
        let token = SelectionToken::new(self.next_token);
        self.selection.pending = Some(token);
        tracing::debug!(%requestor, %token, "requesting host selection");
        self.ports.selection.convert_selection(requestor, token);

        while self.selection.pending.is_some() {
            let Some(event) = self.ports.selection.next_event() else {
                tracing::warn!(%token, "selection connection closed while waiting for a reply");
                self.selection.pending = None;
                break;
            };
            if let Some(foreign) = self.dispatch_event(event) {
                self.interleave(foreign);
            }
        }

        let present = self.formats.is_present(CF_OEMTEXT);
        tracing::debug!(present, "host selection as OEM text");
        present
    }

    /// Handle one selection event. Events that are not about the selection
    /// are handed back.
    pub fn dispatch_event(&mut self, event: SelectionEvent) -> Option<ForeignEvent> {
        match event {
            SelectionEvent::SelectionNotify {
                requestor,
                token,
                data,
            } => {
                if self.selection.pending == Some(token) {
                    self.read_selection(data);
                } else {
                    tracing::debug!(%requestor, %token, "dropping stale selection reply");
                }
                None
            }
            SelectionEvent::SelectionClear { window } => {
                self.selection_cleared(window);
                None
            }
            SelectionEvent::Foreign(event) => Some(event),
        }
    }

    /// Dispatch everything the connection has queued, returning the events
    /// that were not about the selection.
    pub fn drain_selection_events(&mut self) -> Vec<ForeignEvent> {
        let mut foreign = Vec::new();
        while let Some(event) = self.ports.selection.next_event() {
            foreign.extend(self.dispatch_event(event));
        }
        foreign
    }

    fn interleave(&mut self, event: ForeignEvent) {
        match self.interleaved.take() {
            Some(mut handler) => {
                tracing::debug!(event = %event.name, "dispatching interleaved event");
                handler.handle(self, event);
                if self.interleaved.is_none() {
                    self.interleaved = Some(handler);
                }
            }
            None => {
                tracing::debug!(event = %event.name, "deferring interleaved event");
                self.deferred.push_back(event);
            }
        }
    }

    /// Reply to a selection request. Host text becomes the OEM text record,
    /// with `\n` widened to `\r\n` and a trailing NUL.
    pub fn read_selection(&mut self, data: Option<Vec<u8>>) -> bool {
        let stored = data
            .filter(|bytes| !bytes.is_empty())
            .and_then(|bytes| self.store_text(&bytes));

        if let Some(block) = stored {
            for id in [CF_TEXT, CF_OEMTEXT] {
                if self.formats.get(id).is_some_and(|record| record.is_occupied()) {
                    self.delete_record(id);
                }
            }
            if let Some(record) = self.formats.get_mut(CF_OEMTEXT) {
                record.data_present = true;
                record.data = Some(block);
            }
        }
        self.selection.pending = None;
        stored.is_some()
    }

    fn store_text(&self, bytes: &[u8]) -> Option<GlobalHandle> {
        let newlines = bytes.iter().filter(|&&byte| byte == b'\n').count();
        let mut text = Vec::with_capacity(bytes.len() + newlines + 1);
        for &byte in bytes {
            if byte == b'\n' {
                text.push(b'\r');
            }
            text.push(byte);
        }
        text.push(0);

        let block = self.ports.memory.alloc(text.len())?;
        if !self.ports.memory.write(block, &text) {
            self.ports.memory.free(block);
            return None;
        }
        Some(block)
    }

    /// The host reports that `window` lost the selection.
    ///
    /// Cached data stays available internally. When the loss concerns the
    /// window we handed the selection over from, the successor re-claims it
    /// unless someone else took it in between.
    pub fn selection_cleared(&mut self, window: NativeWindow) {
        tracing::debug!(
            %window,
            current = ?self.selection.window,
            previous = ?self.selection.previous,
            "selection cleared"
        );
        if self.selection.acquired {
            if Some(window) == self.selection.window || self.selection.previous.is_none() {
                self.selection.acquired = false;
                self.selection.window = None;
            } else if Some(window) == self.selection.previous
                && self.ports.selection.owner().is_none()
            {
                if let Some(successor) = self.selection.window {
                    self.ports.selection.set_owner(Some(successor));
                }
            }
        }
        self.selection.previous = None;
    }

    /// `hwnd` is being destroyed. If its native window holds the selection,
    /// hand the selection to the next sibling, or to the parent's first
    /// child, and keep it only if the host confirms.
    pub fn check_selection(&mut self, hwnd: Hwnd) {
        let own = self.ports.windows.native_window(hwnd);
        if !self.selection.acquired || self.selection.window.is_none() || own != self.selection.window {
            return;
        }

        self.selection.previous = self.selection.window.take();
        let windows = &self.ports.windows;
        let successor = match windows.next_sibling(hwnd) {
            Some(next) => windows.native_window(next),
            None => windows
                .parent(hwnd)
                .and_then(|parent| windows.first_child(parent))
                .filter(|child| *child != hwnd)
                .and_then(|child| windows.native_window(child)),
        };
        tracing::debug!(from = ?self.selection.previous, to = ?successor, "moving selection");

        if let Some(successor) = successor {
            self.ports.selection.set_owner(Some(successor));
            if self.ports.selection.owner() == Some(successor) {
                self.selection.window = Some(successor);
            }
        }
    }
}
