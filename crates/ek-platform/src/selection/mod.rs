//! In-process display server for the host selection protocol.
//!
//! Several clients share one [`SelectionDisplay`]. Each client owns
//! native windows and an event queue; the selection has at most one owner
//! window at a time.

mod display;

pub use display::{ClientId, ForeignClient, SelectionConnection, SelectionDisplay};
