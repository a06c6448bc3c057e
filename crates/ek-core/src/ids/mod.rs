//! Identifier newtypes shared by the clipboard and the ports.
//!
//! Zero is never a valid value for any of these; "no window" and "no data"
//! are expressed as `Option::None` instead.

use std::fmt;
use std::num::NonZero;

use serde::{Deserialize, Serialize};

macro_rules! impl_id {
    ($($name:ident($inner:ty)),* $(,)?) => {
        $(
            impl $name {
                /// Wrap a raw value, mapping the null value 0 to `None`.
                pub fn new(raw: $inner) -> Option<Self> {
                    (raw != 0).then_some(Self(raw))
                }

                pub const fn from_non_zero(raw: NonZero<$inner>) -> Self {
                    Self(raw.get())
                }

                pub fn raw(self) -> $inner {
                    self.0
                }

                /// Raw value of an optional id, 0 for `None`.
                pub fn raw_or_null(id: Option<Self>) -> $inner {
                    id.map_or(0, Self::raw)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{:#06x}", self.0)
                }
            }
        )*
    };
}

/// Emulated window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hwnd(u32);

/// Window identity in the external windowing system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NativeWindow(u64);

/// Handle of a relocatable global memory block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobalHandle(u16);

impl_id!(Hwnd(u32), NativeWindow(u64), GlobalHandle(u16));
