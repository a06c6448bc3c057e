//! # ek-platform
//!
//! Windowing side of emukrnl: the emulated window tree with synchronous
//! message delivery, an in-process display server implementing the
//! host selection protocol, and the graphics object stub.

pub mod gdi;
pub mod selection;
pub mod window;

pub use gdi::NullGdi;
pub use selection::{ForeignClient, SelectionConnection, SelectionDisplay};
pub use window::{ClipboardMessageHandler, WindowError, WindowManager};
