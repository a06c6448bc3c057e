//! Handle indirection and reference-counted kernel objects.

mod object;
mod table;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use object::{KernelObject, KernelObjectBody, ObjectKind, ObjectRef};
pub use table::{HandleTable, DEFAULT_HANDLE_COUNT, MAX_HANDLE_COUNT, MIN_HANDLE_COUNT};

/// Small process-local integer naming a handle table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(u32);

impl Handle {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    /// Slot index, `None` for the reserved raw value 0.
    pub(crate) fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
