use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ek_core::ids::NativeWindow;
use ek_core::ports::{ForeignEvent, SelectionEvent, SelectionPort, SelectionToken};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

const FIRST_NATIVE_WINDOW: NonZeroU64 = NonZeroU64::MIN.saturating_add(0x40_0000);

/// Connection id on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

struct ClientSlot {
    sender: UnboundedSender<SelectionEvent>,
    /// Text handed out when a window of this client owns the selection.
    served_text: Option<Vec<u8>>,
}

struct DisplayState {
    next_client: u32,
    next_window: NonZeroU64,
    clients: HashMap<ClientId, ClientSlot>,
    windows: HashMap<NativeWindow, ClientId>,
    owner: Option<NativeWindow>,
}

impl DisplayState {
    fn send(&self, window: NativeWindow, event: SelectionEvent) -> bool {
        let Some(client) = self.windows.get(&window) else {
            return false;
        };
        self.clients
            .get(client)
            .is_some_and(|slot| slot.sender.send(event).is_ok())
    }
}

/// Shared display. Cloning yields another reference to the same server.
#[derive(Clone)]
pub struct SelectionDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl Default for SelectionDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionDisplay {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DisplayState {
                next_client: 1,
                next_window: FIRST_NATIVE_WINDOW,
                clients: HashMap::new(),
                windows: HashMap::new(),
                owner: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a client connection with its own event queue.
    pub fn connect(&self) -> SelectionConnection {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let client = ClientId(state.next_client);
        state.next_client += 1;
        state.clients.insert(
            client,
            ClientSlot {
                sender,
                served_text: None,
            },
        );
        tracing::debug!(%client, "display client connected");
        SelectionConnection {
            display: self.clone(),
            client,
            receiver: Mutex::new(receiver),
        }
    }

    /// Connect another application with a single top-level window.
    pub fn connect_foreign(&self) -> ForeignClient {
        let connection = self.connect();
        let window = connection.create_window();
        ForeignClient { connection, window }
    }

    pub fn owner(&self) -> Option<NativeWindow> {
        self.lock().owner
    }

    /// Queue an event unrelated to the selection for `window`'s client.
    pub fn post_event(&self, window: NativeWindow, name: &str) -> bool {
        let event = SelectionEvent::Foreign(ForeignEvent {
            window: Some(window),
            name: name.to_string(),
        });
        self.lock().send(window, event)
    }

    fn set_owner(&self, window: Option<NativeWindow>) {
        let mut state = self.lock();
        if let Some(window) = window {
            if !state.windows.contains_key(&window) {
                tracing::debug!(%window, "ownership claim for an unknown window ignored");
                return;
            }
        }
        let previous = state.owner;
        if previous == window {
            return;
        }
        state.owner = window;
        tracing::debug!(?previous, owner = ?window, "selection owner changed");
        if let Some(previous) = previous {
            state.send(previous, SelectionEvent::SelectionClear { window: previous });
        }
    }

    /// Reply immediately on the requestor's queue with the owner's text.
    fn convert_selection(&self, requestor: NativeWindow, token: SelectionToken) {
        let state = self.lock();
        let data = state
            .owner
            .and_then(|owner| state.windows.get(&owner))
            .and_then(|client| state.clients.get(client))
            .and_then(|slot| slot.served_text.clone());
        tracing::trace!(%requestor, %token, served = data.is_some(), "converting selection");
        if !state.send(
            requestor,
            SelectionEvent::SelectionNotify {
                requestor,
                token,
                data,
            },
        ) {
            tracing::debug!(%requestor, "conversion request from an unknown window");
        }
    }

    fn disconnect(&self, client: ClientId) {
        let mut state = self.lock();
        state.clients.remove(&client);
        state.windows.retain(|_, owner| *owner != client);
        if state
            .owner
            .is_some_and(|owner| !state.windows.contains_key(&owner))
        {
            state.owner = None;
        }
        tracing::debug!(%client, "display client disconnected");
    }
}

/// One client's view of the display.
pub struct SelectionConnection {
    display: SelectionDisplay,
    client: ClientId,
    receiver: Mutex<UnboundedReceiver<SelectionEvent>>,
}

impl SelectionConnection {
    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn display(&self) -> &SelectionDisplay {
        &self.display
    }

    pub fn create_window(&self) -> NativeWindow {
        let mut state = self.display.lock();
        let window = NativeWindow::from_non_zero(state.next_window);
        state.next_window = state.next_window.saturating_add(1);
        state.windows.insert(window, self.client);
        window
    }

    /// Forget `window`. If it owned the selection, nobody owns it now.
    pub fn destroy_window(&self, window: NativeWindow) {
        let mut state = self.display.lock();
        if state.windows.get(&window) != Some(&self.client) {
            return;
        }
        state.windows.remove(&window);
        if state.owner == Some(window) {
            state.owner = None;
        }
    }

    /// Text this client hands out while one of its windows owns the
    /// selection.
    pub fn serve_text(&self, text: Option<Vec<u8>>) {
        if let Some(slot) = self.display.lock().clients.get_mut(&self.client) {
            slot.served_text = text;
        }
    }

    /// Remove every queued event.
    pub fn drain(&self) -> Vec<SelectionEvent> {
        std::iter::from_fn(|| self.next_event()).collect()
    }
}

impl SelectionPort for SelectionConnection {
    fn set_owner(&self, window: Option<NativeWindow>) {
        if let Some(window) = window {
            if self.display.lock().windows.get(&window) != Some(&self.client) {
                tracing::debug!(%window, client = %self.client, "cannot claim with a foreign window");
                return;
            }
        } else if self
            .display
            .owner()
            .is_some_and(|owner| self.display.lock().windows.get(&owner) != Some(&self.client))
        {
            // Only the owning client can release.
            return;
        }
        self.display.set_owner(window);
    }

    fn owner(&self) -> Option<NativeWindow> {
        self.display.owner()
    }

    fn convert_selection(&self, requestor: NativeWindow, token: SelectionToken) {
        self.display.convert_selection(requestor, token);
    }

    /// Queued events only; an empty queue ends a pump instead of blocking.
    fn next_event(&self) -> Option<SelectionEvent> {
        let mut receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        match receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for SelectionConnection {
    fn drop(&mut self) {
        self.display.disconnect(self.client);
    }
}

/// Another application on the display, holding a single window.
pub struct ForeignClient {
    connection: SelectionConnection,
    window: NativeWindow,
}

impl ForeignClient {
    pub fn window(&self) -> NativeWindow {
        self.window
    }

    /// Take the selection, offering `text`.
    pub fn claim(&self, text: &[u8]) {
        self.connection.serve_text(Some(text.to_vec()));
        self.connection.set_owner(Some(self.window));
    }

    pub fn release(&self) {
        if self.owns_selection() {
            self.connection.set_owner(None);
        }
        self.connection.serve_text(None);
    }

    pub fn owns_selection(&self) -> bool {
        self.connection.owner() == Some(self.window)
    }

    pub fn events(&self) -> Vec<SelectionEvent> {
        self.connection.drain()
    }
}
