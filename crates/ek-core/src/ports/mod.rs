//! Port interfaces consumed by the kernel core.
//!
//! Every collaborator outside the handle table and the clipboard state
//! machine is reached through one of these traits. Infrastructure adapters
//! live in `ek-infra` (storage, paths, memory, text, clock) and
//! `ek-platform` (windows, message delivery, selection, graphics).

mod clock;
mod gdi;
mod memory;
mod native_fs;
mod path_resolver;
mod selection;
mod text_codec;
mod window;

pub use clock::ClockPort;
pub use gdi::GdiObjectPort;
pub use memory::GlobalMemoryPort;
pub use native_fs::{
    NativeAccess, NativeFile, NativeFileType, NativeFsPort, NativeOpenOptions, NativeStat,
};
pub use path_resolver::{DeviceAlias, DosFullName, PathResolverPort};
pub use selection::{ForeignEvent, SelectionEvent, SelectionPort, SelectionToken};
pub use text_codec::TextCodecPort;
pub use window::{MessageDeliveryPort, WindowTreePort};

#[cfg(test)]
pub use clock::MockClock;
#[cfg(test)]
pub use native_fs::{MockNativeDescriptor, MockNativeFs};
#[cfg(test)]
pub use path_resolver::MockPathResolver;
#[cfg(test)]
pub use selection::MockSelection;
#[cfg(test)]
pub use window::MockWindowTree;
