use crate::ids::GlobalHandle;

/// Deletion of graphics objects stored on the clipboard.
pub trait GdiObjectPort: Send + Sync {
    fn delete_object(&self, handle: GlobalHandle) -> bool;
}
