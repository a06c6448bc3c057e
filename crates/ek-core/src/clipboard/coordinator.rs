//! Clipboard state machine: open/close locking, ownership, data records,
//! text aliasing and lazy rendering.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use super::format::{
    is_gdi_format, is_text_format, text_sibling, ClipFormat, FormatId, FormatRegistry, CF_OEMTEXT,
    CF_TEXT,
};
use super::message::ClipboardMessage;
use super::state::{ClipboardState, SelectionMirror};
use crate::ids::{GlobalHandle, Hwnd};
use crate::ports::{
    ForeignEvent, GdiObjectPort, GlobalMemoryPort, MessageDeliveryPort, SelectionPort,
    TextCodecPort, WindowTreePort,
};

/// Collaborators of the coordinator.
#[derive(Clone)]
pub struct ClipboardPorts {
    pub windows: Arc<dyn WindowTreePort>,
    pub messages: Arc<dyn MessageDeliveryPort>,
    pub selection: Arc<dyn SelectionPort>,
    pub memory: Arc<dyn GlobalMemoryPort>,
    pub codec: Arc<dyn TextCodecPort>,
    pub gdi: Arc<dyn GdiObjectPort>,
}

/// Receives events that arrive while the coordinator waits for the
/// selection owner's reply.
///
/// The handler runs inside the wait and may call back into the
/// coordinator. Without a handler such events are queued, see
/// [`ClipboardCoordinator::take_deferred_events`].
pub trait InterleavedEventHandler: Send {
    fn handle(&mut self, clipboard: &mut ClipboardCoordinator, event: ForeignEvent);
}

impl<F> InterleavedEventHandler for F
where
    F: FnMut(&mut ClipboardCoordinator, ForeignEvent) + Send,
{
    fn handle(&mut self, clipboard: &mut ClipboardCoordinator, event: ForeignEvent) {
        self(clipboard, event)
    }
}

pub struct ClipboardCoordinator {
    pub(super) ports: ClipboardPorts,
    pub(super) formats: FormatRegistry,
    pub(super) state: ClipboardState,
    pub(super) selection: SelectionMirror,
    pub(super) next_token: u64,
    pub(super) interleaved: Option<Box<dyn InterleavedEventHandler>>,
    pub(super) deferred: VecDeque<ForeignEvent>,
}

impl ClipboardCoordinator {
    pub fn new(ports: ClipboardPorts) -> Self {
        Self {
            ports,
            formats: FormatRegistry::new(),
            state: ClipboardState::default(),
            selection: SelectionMirror::default(),
            next_token: 0,
            interleaved: None,
            deferred: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &ClipboardState {
        &self.state
    }

    pub fn selection_state(&self) -> &SelectionMirror {
        &self.selection
    }

    pub fn format(&self, id: FormatId) -> Option<&ClipFormat> {
        self.formats.get(id)
    }

    pub fn formats(&self) -> impl Iterator<Item = &ClipFormat> {
        self.formats.iter()
    }

    pub fn owner(&self) -> Option<Hwnd> {
        self.state.owner
    }

    pub fn open_window(&self) -> Option<Hwnd> {
        self.state.opener
    }

    pub fn viewer(&self) -> Option<Hwnd> {
        self.state.viewer
    }

    /// Deliver `message` synchronously, lending the coordinator to the target.
    pub(super) fn send(&mut self, target: Hwnd, message: ClipboardMessage) -> isize {
        tracing::trace!(%target, ?message, "sending clipboard message");
        let messages = Arc::clone(&self.ports.messages);
        messages.send_message(target, message, self)
    }

    /// Lock the clipboard for `hwnd`. Fails, changing nothing, when some
    /// window already has it open.
    pub fn open(&mut self, hwnd: Hwnd) -> bool {
        if let Some(opener) = self.state.opener {
            tracing::debug!(%hwnd, %opener, "clipboard already open");
            return false;
        }
        self.state.opener = Some(hwnd);
        self.state.changed = false;
        tracing::debug!(%hwnd, "clipboard opened");
        true
    }

    /// Unlock the clipboard and tell the viewer chain when contents changed.
    pub fn close(&mut self) -> bool {
        if self.state.opener.take().is_none() {
            return false;
        }
        if self.state.changed {
            if let Some(viewer) = self.state.viewer {
                self.send(viewer, ClipboardMessage::DrawClipboard);
            }
        }
        true
    }

    /// Drop every record, make the opener the owner and give the host
    /// selection up.
    pub fn empty(&mut self) -> bool {
        let Some(opener) = self.state.opener else {
            return false;
        };
        if let Some(owner) = self.state.owner {
            self.send(owner, ClipboardMessage::DestroyClipboard);
        }

        let occupied: Vec<FormatId> = self
            .formats
            .iter()
            .filter(|record| record.is_occupied())
            .map(|record| record.id)
            .collect();
        for id in occupied {
            self.delete_record(id);
        }

        self.state.owner = Some(opener);
        self.give_up_selection();
        self.state.changed = true;
        tracing::debug!(owner = %opener, "clipboard emptied");
        true
    }

    /// Free a record's data and clear its presence flag.
    pub(super) fn delete_record(&mut self, id: FormatId) {
        let Some(record) = self.formats.get_mut(id) else {
            return;
        };
        if let Some(data) = record.data.take() {
            let freed = if is_gdi_format(id) {
                self.ports.gdi.delete_object(data)
            } else {
                self.ports.memory.free(data)
            };
            if !freed {
                tracing::debug!(format = id, %data, "clipboard data was already gone");
            }
        }
        record.data_present = false;
        self.state.changed = true;
    }

    /// Store `data` for `format`. `None` promises the data for later; the
    /// owner receives a render request when somebody asks for it.
    ///
    /// Returns the stored handle, `None` for a promise or an unknown format.
    pub fn set_data(&mut self, format: FormatId, data: Option<GlobalHandle>) -> Option<GlobalHandle> {
        self.formats.ensure_gdi(format);
        let Some(record) = self.formats.get(format) else {
            tracing::debug!(format, "set_data for unknown format");
            return None;
        };
        let occupied = record.is_occupied();

        if is_text_format(format) && !self.selection.acquired {
            self.claim_selection();
        }

        if occupied {
            self.delete_record(format);
            if let Some(sibling) = text_sibling(format) {
                let rendered_alias = self
                    .formats
                    .get(sibling)
                    .is_some_and(|alias| alias.data.is_some() && !alias.data_present);
                if rendered_alias {
                    self.delete_record(sibling);
                }
            }
        }

        self.state.changed = true;
        let record = self.formats.get_mut(format)?;
        record.data_present = true;
        record.data = data;
        data
    }

    /// Data for `format`, rendering it first when only promised.
    ///
    /// A text variant with no data of its own is converted from the other
    /// one into its own record; the source record keeps its handle.
    pub fn get_data(&mut self, format: FormatId) -> Option<GlobalHandle> {
        if !self.state.is_open() {
            tracing::debug!(format, "get_data while clipboard is closed");
            return None;
        }

        let (render, update) = match text_sibling(format) {
            Some(sibling)
                if !self.formats.is_present(format) && self.formats.is_present(sibling) =>
            {
                tracing::debug!(from = sibling, to = format, "aliasing text format");
                (sibling, format)
            }
            _ => {
                self.formats.get(format)?;
                (format, format)
            }
        };

        if !self.render_format(render) {
            return None;
        }
        if update != render && self.formats.get(update).is_some_and(|record| record.data.is_none()) {
            self.render_text(update, render);
        }
        self.formats.get(update).and_then(|record| record.data)
    }

    /// Ask the owner to fulfil a promise. A vanished owner forfeits the
    /// promise and the ownership.
    fn render_format(&mut self, format: FormatId) -> bool {
        let Some(record) = self.formats.get(format) else {
            return false;
        };
        if record.is_promise() {
            let owner = self
                .state
                .owner
                .filter(|owner| self.ports.windows.is_window(*owner));
            match owner {
                Some(owner) => {
                    self.send(owner, ClipboardMessage::RenderFormat(format));
                }
                None => {
                    tracing::debug!(owner = ?self.state.owner, format, "clipboard owner is lost");
                    self.state.owner = None;
                    if let Some(record) = self.formats.get_mut(format) {
                        record.data_present = false;
                    }
                    return false;
                }
            }
        }
        self.formats
            .get(format)
            .is_some_and(|record| record.data.is_some())
    }

    /// Character-set conversion of `source`'s data into a new block for
    /// `target`.
    fn render_text(&mut self, target: FormatId, source: FormatId) -> bool {
        let Some(source_data) = self.formats.get(source).and_then(|record| record.data) else {
            return false;
        };
        let Some(bytes) = self.ports.memory.read(source_data) else {
            return false;
        };
        let converted = if source == CF_TEXT {
            self.ports.codec.ansi_to_oem(&bytes)
        } else {
            self.ports.codec.oem_to_ansi(&bytes)
        };

        let Some(block) = self.ports.memory.alloc(converted.len()) else {
            tracing::debug!(size = converted.len(), "no memory for converted text");
            return false;
        };
        if !self.ports.memory.write(block, &converted) {
            self.ports.memory.free(block);
            return false;
        }
        tracing::debug!(from = source, to = target, size = converted.len(), "converted text");
        match self.formats.get_mut(target) {
            Some(record) => {
                record.data = Some(block);
                true
            }
            None => {
                self.ports.memory.free(block);
                false
            }
        }
    }

    pub fn register_format(&mut self, name: &str) -> FormatId {
        self.formats.register(name)
    }

    pub fn format_name(&self, format: FormatId) -> Option<&str> {
        self.formats.name(format)
    }

    /// Formats with data, counting a one-sided text alias as an extra format.
    pub fn count_formats(&mut self) -> usize {
        if !self.selection.acquired {
            self.request_external_selection();
        }
        let text = usize::from(self.formats.is_present(CF_TEXT));
        let oem = usize::from(self.formats.is_present(CF_OEMTEXT));
        text.abs_diff(oem) + self.formats.iter().filter(|record| record.data_present).count()
    }

    /// Next available format after `after` (0 starts the walk), or 0 at the
    /// end. OEM text is listed whenever plain text is available.
    pub fn enum_formats(&mut self, after: FormatId) -> FormatId {
        if !self.state.is_open() {
            return 0;
        }
        if (after == 0 || is_text_format(after)) && !self.selection.acquired {
            self.request_external_selection();
        }

        let text_present = self.formats.is_present(CF_TEXT);
        let mut after = after;
        if after == 0 {
            if text_present || self.formats.is_present(CF_OEMTEXT) {
                return CF_TEXT;
            }
            after = CF_TEXT;
        }

        let Some(position) = self.formats.position(after) else {
            return 0;
        };
        self.formats
            .iter()
            .skip(position + 1)
            .find(|record| record.data_present || (record.id == CF_OEMTEXT && text_present))
            .map_or(0, |record| record.id)
    }

    pub fn is_format_available(&mut self, format: FormatId) -> bool {
        if is_text_format(format) && !self.selection.acquired {
            self.request_external_selection();
        }
        self.is_present(format)
    }

    /// Presence with the two text variants standing in for each other.
    pub fn is_present(&self, format: FormatId) -> bool {
        if is_text_format(format) {
            return self.formats.is_present(CF_TEXT) || self.formats.is_present(CF_OEMTEXT);
        }
        self.formats.is_present(format)
    }

    /// Install a new viewer chain head, returning the previous one.
    pub fn set_viewer(&mut self, hwnd: Option<Hwnd>) -> Option<Hwnd> {
        tracing::debug!(viewer = ?hwnd, "set clipboard viewer");
        std::mem::replace(&mut self.state.viewer, hwnd)
    }

    /// Take `removed` out of the viewer chain. True when the head reports
    /// it handled the change.
    pub fn change_chain(&mut self, removed: Hwnd, next: Option<Hwnd>) -> bool {
        let handled = match self.state.viewer {
            Some(head) => self.send(head, ClipboardMessage::ChangeCbChain { removed, next }) == 0,
            None => {
                tracing::debug!(%removed, "viewer chain head is lost");
                false
            }
        };
        if self.state.viewer == Some(removed) {
            self.state.viewer = next;
        }
        handled
    }

    /// A window is being destroyed. If it owns the clipboard it renders
    /// everything it promised; promises it leaves open are dropped. Then
    /// the host selection is moved off the window if it held it.
    pub fn disown(&mut self, hwnd: Hwnd) {
        tracing::debug!(%hwnd, owner = ?self.state.owner, "disown");
        if self.state.owner == Some(hwnd) {
            self.send(hwnd, ClipboardMessage::RenderAllFormats);
            for record in self.formats.iter_mut().filter(|record| record.is_promise()) {
                tracing::debug!(format = record.id, "data missing after render-all");
                record.data_present = false;
            }
            self.state.owner = None;
        }
        self.check_selection(hwnd);
    }

    pub fn set_interleaved_handler(&mut self, handler: Box<dyn InterleavedEventHandler>) {
        self.interleaved = Some(handler);
    }

    pub fn clear_interleaved_handler(&mut self) -> Option<Box<dyn InterleavedEventHandler>> {
        self.interleaved.take()
    }

    /// Events queued during selection waits while no handler was installed.
    pub fn take_deferred_events(&mut self) -> Vec<ForeignEvent> {
        self.deferred.drain(..).collect()
    }

    /// Session teardown: free all data and hand the host selection back.
    pub fn release_all(&mut self) {
        let occupied: Vec<FormatId> = self
            .formats
            .iter()
            .filter(|record| record.is_occupied())
            .map(|record| record.id)
            .collect();
        for id in occupied {
            self.delete_record(id);
        }
        self.give_up_selection();
        self.state = ClipboardState::default();
    }
}

impl fmt::Debug for ClipboardCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardCoordinator")
            .field("state", &self.state)
            .field("selection", &self.selection)
            .field("formats", &self.formats.len())
            .field("deferred", &self.deferred.len())
            .finish()
    }
}
