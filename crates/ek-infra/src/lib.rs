//! # ek-infra
//!
//! Adapters behind the `ek-core` ports that run on the host directly:
//! native files, DOS path translation, the global heap, code pages, the
//! clock and configuration loading.

pub mod codec;
pub mod config;
pub mod fs;
pub mod memory;
pub mod paths;
pub mod time;

pub use codec::CodePageCodec;
pub use fs::{StdNativeFile, StdNativeFs};
pub use memory::InMemoryGlobalHeap;
pub use paths::DosPathResolver;
pub use time::SystemClock;
