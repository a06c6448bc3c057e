//! Emulated window hierarchy and synchronous message delivery.
//!
//! Windows live in an arena keyed by [`Hwnd`]. Every window except the
//! desktop has a parent; top-level windows are children of the desktop.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ek_core::clipboard::{ClipboardCoordinator, ClipboardMessage};
use ek_core::ids::{Hwnd, NativeWindow};
use ek_core::ports::{MessageDeliveryPort, WindowTreePort};

const DESKTOP: Hwnd = Hwnd::from_non_zero(NonZeroU32::MIN);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("no such window: {0}")]
    NoSuchWindow(Hwnd),

    #[error("the desktop window cannot be destroyed")]
    DesktopIsPermanent,

    #[error("window ids exhausted")]
    IdsExhausted,
}

/// Window procedure for the clipboard messages.
///
/// The coordinator is lent to the handler for the duration of the call, so
/// a render request can be answered with `set_data` right away.
pub trait ClipboardMessageHandler: Send {
    fn on_message(
        &mut self,
        hwnd: Hwnd,
        message: ClipboardMessage,
        clipboard: &mut ClipboardCoordinator,
    ) -> isize;
}

impl<F> ClipboardMessageHandler for F
where
    F: FnMut(Hwnd, ClipboardMessage, &mut ClipboardCoordinator) -> isize + Send,
{
    fn on_message(
        &mut self,
        hwnd: Hwnd,
        message: ClipboardMessage,
        clipboard: &mut ClipboardCoordinator,
    ) -> isize {
        self(hwnd, message, clipboard)
    }
}

struct WindowNode {
    parent: Option<Hwnd>,
    children: Vec<Hwnd>,
    native: Option<NativeWindow>,
    title: String,
    handler: Option<Box<dyn ClipboardMessageHandler>>,
}

impl WindowNode {
    fn new(parent: Option<Hwnd>, native: Option<NativeWindow>, title: &str) -> Self {
        Self {
            parent,
            children: Vec::new(),
            native,
            title: title.to_string(),
            handler: None,
        }
    }
}

struct WindowArena {
    nodes: HashMap<Hwnd, WindowNode>,
    next_id: u32,
    active: Option<Hwnd>,
}

impl WindowArena {
    fn node(&self, hwnd: Hwnd) -> Result<&WindowNode, WindowError> {
        self.nodes.get(&hwnd).ok_or(WindowError::NoSuchWindow(hwnd))
    }

    fn node_mut(&mut self, hwnd: Hwnd) -> Result<&mut WindowNode, WindowError> {
        self.nodes
            .get_mut(&hwnd)
            .ok_or(WindowError::NoSuchWindow(hwnd))
    }

    /// `hwnd` and its descendants, children before parents.
    fn subtree_post_order(&self, hwnd: Hwnd) -> Vec<Hwnd> {
        let mut order = Vec::new();
        let mut stack = vec![(hwnd, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            stack.push((current, true));
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev().map(|child| (*child, false)));
            }
        }
        order
    }
}

pub struct WindowManager {
    arena: Mutex<WindowArena>,
    desktop: Hwnd,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager {
    pub fn new() -> Self {
        let desktop = DESKTOP;
        let mut nodes = HashMap::new();
        nodes.insert(desktop, WindowNode::new(None, None, "Desktop"));
        Self {
            arena: Mutex::new(WindowArena {
                nodes,
                next_id: DESKTOP.raw() + 1,
                active: None,
            }),
            desktop,
        }
    }

    pub fn desktop(&self) -> Hwnd {
        self.desktop
    }

    fn lock(&self) -> MutexGuard<'_, WindowArena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a window under `parent` (the desktop when `None`), appended
    /// after its existing siblings.
    pub fn create_window(
        &self,
        parent: Option<Hwnd>,
        native: Option<NativeWindow>,
        title: &str,
    ) -> Result<Hwnd, WindowError> {
        let parent = parent.unwrap_or(self.desktop);
        let mut arena = self.lock();
        arena.node(parent)?;

        let hwnd = Hwnd::new(arena.next_id).ok_or(WindowError::IdsExhausted)?;
        arena.next_id = arena
            .next_id
            .checked_add(1)
            .ok_or(WindowError::IdsExhausted)?;
        arena.node_mut(parent)?.children.push(hwnd);
        arena
            .nodes
            .insert(hwnd, WindowNode::new(Some(parent), native, title));
        tracing::debug!(%hwnd, %parent, ?native, title, "window created");
        Ok(hwnd)
    }

    pub fn set_handler(
        &self,
        hwnd: Hwnd,
        handler: Box<dyn ClipboardMessageHandler>,
    ) -> Result<(), WindowError> {
        self.lock().node_mut(hwnd)?.handler = Some(handler);
        Ok(())
    }

    pub fn set_active(&self, hwnd: Option<Hwnd>) -> Result<(), WindowError> {
        let mut arena = self.lock();
        if let Some(hwnd) = hwnd {
            arena.node(hwnd)?;
        }
        arena.active = hwnd;
        Ok(())
    }

    pub fn title(&self, hwnd: Hwnd) -> Option<String> {
        self.lock().nodes.get(&hwnd).map(|node| node.title.clone())
    }

    pub fn children(&self, hwnd: Hwnd) -> Vec<Hwnd> {
        self.lock()
            .nodes
            .get(&hwnd)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn window_count(&self) -> usize {
        self.lock().nodes.len()
    }

    /// Destroy `hwnd` and its descendants, deepest first.
    ///
    /// Each window is disowned from the clipboard while it is still linked
    /// into the tree, so the selection can move to a sibling.
    pub fn destroy_window(
        &self,
        hwnd: Hwnd,
        clipboard: &mut ClipboardCoordinator,
    ) -> Result<(), WindowError> {
        if hwnd == self.desktop {
            return Err(WindowError::DesktopIsPermanent);
        }
        let order = {
            let arena = self.lock();
            arena.node(hwnd)?;
            arena.subtree_post_order(hwnd)
        };

        for window in order {
            clipboard.disown(window);

            let mut arena = self.lock();
            let Some(node) = arena.nodes.remove(&window) else {
                continue;
            };
            if let Some(parent) = node.parent.and_then(|parent| arena.nodes.get_mut(&parent)) {
                parent.children.retain(|child| *child != window);
            }
            if arena.active == Some(window) {
                arena.active = None;
            }
            tracing::debug!(%window, title = %node.title, "window destroyed");
        }
        Ok(())
    }
}

impl WindowTreePort for WindowManager {
    fn is_window(&self, hwnd: Hwnd) -> bool {
        self.lock().nodes.contains_key(&hwnd)
    }

    fn native_window(&self, hwnd: Hwnd) -> Option<NativeWindow> {
        self.lock().nodes.get(&hwnd).and_then(|node| node.native)
    }

    fn active_window(&self) -> Option<Hwnd> {
        self.lock().active
    }

    fn parent(&self, hwnd: Hwnd) -> Option<Hwnd> {
        self.lock().nodes.get(&hwnd).and_then(|node| node.parent)
    }

    fn next_sibling(&self, hwnd: Hwnd) -> Option<Hwnd> {
        let arena = self.lock();
        let parent = arena.nodes.get(&hwnd)?.parent?;
        let siblings = &arena.nodes.get(&parent)?.children;
        let position = siblings.iter().position(|child| *child == hwnd)?;
        siblings.get(position + 1).copied()
    }

    fn first_child(&self, hwnd: Hwnd) -> Option<Hwnd> {
        self.lock()
            .nodes
            .get(&hwnd)
            .and_then(|node| node.children.first().copied())
    }
}

impl MessageDeliveryPort for WindowManager {
    /// Run the target's handler without holding the arena lock. A window
    /// without a handler, or one already handling a message, gets the
    /// default reply 0.
    fn send_message(
        &self,
        target: Hwnd,
        message: ClipboardMessage,
        clipboard: &mut ClipboardCoordinator,
    ) -> isize {
        let handler = match self.lock().nodes.get_mut(&target) {
            Some(node) => node.handler.take(),
            None => {
                tracing::debug!(%target, ?message, "message to a destroyed window");
                return 0;
            }
        };
        let Some(mut handler) = handler else {
            return 0;
        };

        let reply = handler.on_message(target, message, clipboard);

        if let Some(node) = self.lock().nodes.get_mut(&target) {
            if node.handler.is_none() {
                node.handler = Some(handler);
            }
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(raw: u64) -> NativeWindow {
        NativeWindow::new(raw).unwrap()
    }

    #[test]
    fn test_top_level_windows_hang_off_the_desktop() {
        let windows = WindowManager::new();
        let first = windows.create_window(None, Some(native(7)), "first").unwrap();
        let second = windows.create_window(None, None, "second").unwrap();

        assert_eq!(windows.parent(first), Some(windows.desktop()));
        assert_eq!(windows.first_child(windows.desktop()), Some(first));
        assert_eq!(windows.next_sibling(first), Some(second));
        assert_eq!(windows.next_sibling(second), None);
        assert_eq!(windows.native_window(first), Some(native(7)));
        assert_eq!(windows.native_window(second), None);
        assert_eq!(windows.parent(windows.desktop()), None);
    }

    #[test]
    fn test_window_ids_follow_the_desktop() {
        let windows = WindowManager::new();
        let first = windows.create_window(None, None, "first").unwrap();

        assert_eq!(windows.desktop().raw(), 1);
        assert_eq!(first.raw(), 2);
        assert_eq!(windows.title(windows.desktop()).as_deref(), Some("Desktop"));
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let windows = WindowManager::new();
        let ghost = Hwnd::new(999).unwrap();

        assert_eq!(
            windows.create_window(Some(ghost), None, "orphan"),
            Err(WindowError::NoSuchWindow(ghost))
        );
        assert_eq!(windows.window_count(), 1);
    }

    #[test]
    fn test_active_window_must_exist() {
        let windows = WindowManager::new();
        let main = windows.create_window(None, None, "main").unwrap();

        windows.set_active(Some(main)).unwrap();
        assert_eq!(windows.active_window(), Some(main));
        assert!(windows.set_active(Hwnd::new(42)).is_err());
        assert_eq!(windows.active_window(), Some(main));
    }

    #[test]
    fn test_post_order_visits_children_first() {
        let windows = WindowManager::new();
        let top = windows.create_window(None, None, "top").unwrap();
        let left = windows.create_window(Some(top), None, "left").unwrap();
        let leaf = windows.create_window(Some(left), None, "leaf").unwrap();
        let right = windows.create_window(Some(top), None, "right").unwrap();

        let order = windows.lock().subtree_post_order(top);

        assert_eq!(order, vec![leaf, left, right, top]);
    }
}
