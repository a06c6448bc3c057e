//! # ek-core
//!
//! Kernel object model, DOS-style file service and clipboard coordinator
//! for emukrnl.
//!
//! This crate holds the emulation semantics only. Native storage, path
//! translation, global memory, windows and the host selection are reached
//! through the traits in [`ports`].

pub mod clipboard;
pub mod config;
pub mod error;
pub mod file;
pub mod handle;
pub mod ids;
pub mod ports;

// Re-export commonly used types at the crate root
pub use clipboard::{ClipboardCoordinator, ClipboardMessage, ClipboardPorts, FormatId};
pub use config::KernelConfig;
pub use error::{DosError, KernelError, KernelResult, LastError};
pub use file::{FileSystem, FileTime, FileType};
pub use handle::{Handle, HandleTable, ObjectKind};
pub use ids::{GlobalHandle, Hwnd, NativeWindow};
