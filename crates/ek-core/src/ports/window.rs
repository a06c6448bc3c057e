use crate::clipboard::{ClipboardCoordinator, ClipboardMessage};
use crate::ids::{Hwnd, NativeWindow};

/// Read access to the emulated window hierarchy.
///
/// Traversal is by id; a destroyed window simply stops resolving.
pub trait WindowTreePort: Send + Sync {
    fn is_window(&self, hwnd: Hwnd) -> bool;

    /// The window's own native window. Child windows usually have none.
    fn native_window(&self, hwnd: Hwnd) -> Option<NativeWindow>;

    fn active_window(&self) -> Option<Hwnd>;
    fn parent(&self, hwnd: Hwnd) -> Option<Hwnd>;
    fn next_sibling(&self, hwnd: Hwnd) -> Option<Hwnd>;
    fn first_child(&self, hwnd: Hwnd) -> Option<Hwnd>;
}

/// Synchronous notification delivery to a window.
///
/// The coordinator is lent to the receiving window for the duration of the
/// call so it can answer a render request with `set_data`.
pub trait MessageDeliveryPort: Send + Sync {
    fn send_message(
        &self,
        target: Hwnd,
        message: ClipboardMessage,
        clipboard: &mut ClipboardCoordinator,
    ) -> isize;
}

#[cfg(test)]
mockall::mock! {
    pub WindowTree {}

    impl WindowTreePort for WindowTree {
        fn is_window(&self, hwnd: Hwnd) -> bool;
        fn native_window(&self, hwnd: Hwnd) -> Option<NativeWindow>;
        fn active_window(&self) -> Option<Hwnd>;
        fn parent(&self, hwnd: Hwnd) -> Option<Hwnd>;
        fn next_sibling(&self, hwnd: Hwnd) -> Option<Hwnd>;
        fn first_child(&self, hwnd: Hwnd) -> Option<Hwnd>;
    }
}
