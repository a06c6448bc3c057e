//! Clipboard coordinator.
//!
//! Formats live in an ordered [`FormatRegistry`]. Ownership, open/close
//! locking and the viewer chain are tracked in [`ClipboardState`]; the two
//! text formats are mirrored to the host selection.

mod coordinator;
mod format;
mod message;
mod selection;
mod state;

pub use coordinator::{ClipboardCoordinator, ClipboardPorts, InterleavedEventHandler};
pub use format::*;
pub use message::ClipboardMessage;
pub use state::{ClipboardState, SelectionMirror};
