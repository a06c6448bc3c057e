use std::sync::Arc;

use super::object::{KernelObject, ObjectEntry, ObjectKind, ObjectRef};
use super::Handle;
use crate::error::{KernelError, KernelResult};

/// Smallest table size `set_handle_count` will go down to.
pub const MIN_HANDLE_COUNT: usize = 20;
/// Largest table size `set_handle_count` will grow to.
pub const MAX_HANDLE_COUNT: usize = 254;
/// Initial table size; `set_handle_count` can always get back to it.
pub const DEFAULT_HANDLE_COUNT: usize = MAX_HANDLE_COUNT;

/// Process-local table mapping handles to reference-counted kernel objects.
///
/// Slot `n` is addressed by `Handle(n + 1)`. Each occupied slot holds one
/// reference on its object; borrows obtained through [`HandleTable::lookup`]
/// hold one more for their lifetime.
#[derive(Debug)]
pub struct HandleTable {
    slots: Vec<Option<Arc<ObjectEntry>>>,
    capacity: usize,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_COUNT)
    }
}

impl HandleTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Install a new object and return its first handle.
    ///
    /// On exhaustion the object is destroyed immediately, so its native
    /// resource does not leak.
    pub fn allocate(&mut self, object: impl Into<KernelObject>) -> KernelResult<Handle> {
        let entry = ObjectEntry::new(object.into());
        match self.install(&entry) {
            Ok(handle) => {
                tracing::trace!(handle = %handle, kind = ?entry.kind(), "allocated handle");
                Ok(handle)
            }
            Err(err) => {
                entry.destroy();
                Err(err)
            }
        }
    }

    fn install(&mut self, entry: &Arc<ObjectEntry>) -> KernelResult<Handle> {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => index,
            None if self.slots.len() < self.capacity => {
                self.slots.push(None);
                self.slots.len() - 1
            }
            None => {
                tracing::debug!(capacity = self.capacity, "handle table exhausted");
                return Err(KernelError::TooManyOpenHandles);
            }
        };
        entry.inc_ref();
        self.slots[index] = Some(Arc::clone(entry));
        Ok(Handle::from_index(index))
    }

    fn slot(&self, handle: Handle) -> KernelResult<&Arc<ObjectEntry>> {
        handle
            .index()
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
            .filter(|entry| !entry.is_destroyed())
            .ok_or(KernelError::InvalidHandle)
    }

    /// Resolve a handle to its object.
    ///
    /// `expected = None` accepts any kind. A kind mismatch is reported as
    /// [`KernelError::InvalidHandle`].
    pub fn lookup(&self, handle: Handle, expected: Option<ObjectKind>) -> KernelResult<ObjectRef> {
        let entry = self.slot(handle)?;
        if let Some(kind) = expected {
            if entry.kind() != kind {
                tracing::debug!(handle = %handle, expected = ?kind, actual = ?entry.kind(), "kind mismatch");
                return Err(KernelError::InvalidHandle);
            }
        }
        Ok(ObjectRef::acquire(entry))
    }

    /// End a borrow obtained from [`HandleTable::lookup`].
    pub fn release(&self, object: ObjectRef) {
        object.release();
    }

    /// Open a second slot on the object behind `handle`.
    pub fn duplicate(&mut self, handle: Handle) -> KernelResult<Handle> {
        let object = self.lookup(handle, None)?;
        let entry = Arc::clone(object.entry());
        drop(object);
        self.install(&entry)
    }

    /// Make `target` refer to the object behind `source` (dup2).
    ///
    /// Whatever `target` held before loses that slot's reference and is
    /// destroyed if nothing else refers to it.
    pub fn remap_slot(&mut self, source: Handle, target: Handle) -> KernelResult<Handle> {
        let object = self.lookup(source, None)?;
        let index = target
            .index()
            .filter(|index| *index < self.capacity)
            .ok_or(KernelError::InvalidHandle)?;
        if source == target {
            return Ok(target);
        }
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }

        object.entry().inc_ref();
        let previous = self.slots[index].replace(Arc::clone(object.entry()));
        drop(object);
        if let Some(previous) = previous {
            tracing::debug!(handle = %target, kind = ?previous.kind(), "remap overwrites occupied slot");
            previous.dec_ref();
        }
        Ok(target)
    }

    /// Free a slot. The object is destroyed when this was its last reference.
    pub fn close(&mut self, handle: Handle) -> KernelResult<()> {
        let index = handle.index().ok_or(KernelError::InvalidHandle)?;
        let entry = self
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(KernelError::InvalidHandle)?;
        tracing::trace!(handle = %handle, kind = ?entry.kind(), "closing handle");
        entry.dec_ref();
        Ok(())
    }

    /// Close every slot. Used at session teardown.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for entry in self.slots.drain(..).flatten() {
            entry.dec_ref();
            closed += 1;
        }
        closed
    }

    /// Resize the table for callers that expect more than the default number
    /// of handles. Never shrinks below the highest occupied slot.
    pub fn set_handle_count(&mut self, count: usize) -> usize {
        let requested = count.clamp(MIN_HANDLE_COUNT, MAX_HANDLE_COUNT);
        let in_use = self
            .slots
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |index| index + 1);
        self.capacity = requested.max(in_use);
        self.slots.truncate(self.capacity);
        self.capacity
    }

    pub fn live_handles(&self) -> Vec<Handle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| Handle::from_index(index))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl Drop for HandleTable {
    fn drop(&mut self) {
        self.close_all();
    }
}
