use crate::ids::GlobalHandle;

/// Relocatable shared memory blocks referenced by opaque handles.
///
/// A failed allocation yields `None`, as does reading a freed or unknown
/// handle. Callers must check both.
pub trait GlobalMemoryPort: Send + Sync {
    /// Allocate a zero-filled block of `size` bytes.
    fn alloc(&self, size: usize) -> Option<GlobalHandle>;

    /// Copy of the block contents.
    fn read(&self, handle: GlobalHandle) -> Option<Vec<u8>>;

    /// Overwrite the start of the block. Fails when `bytes` does not fit.
    fn write(&self, handle: GlobalHandle, bytes: &[u8]) -> bool;

    fn size(&self, handle: GlobalHandle) -> usize;

    fn free(&self, handle: GlobalHandle) -> bool;
}
