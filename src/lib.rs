//! # emukrnl
//!
//! Kernel facade for emulated processes: integer file handles over a
//! reference-counted handle table, DOS path semantics, and the clipboard
//! bridged to the host selection.

pub mod bootstrap;
pub mod cli;
pub mod kernel;

pub use kernel::{Kernel, HFILE_ERROR};
