//! Process-wide global heap with 16-bit handles.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use ek_core::ids::GlobalHandle;
use ek_core::ports::GlobalMemoryPort;

/// Default ceiling on the bytes held by all blocks together.
pub const DEFAULT_HEAP_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Debug, Default)]
struct Heap {
    blocks: HashMap<u16, Vec<u8>>,
    used: usize,
    /// Last handle value given out.
    last: u16,
}

impl Heap {
    /// Next unused non-zero handle value after the last one.
    fn next_handle(&mut self) -> Option<u16> {
        let start = self.last;
        let mut candidate = start;
        loop {
            candidate = candidate.wrapping_add(1);
            if candidate == start {
                return None;
            }
            if candidate != 0 && !self.blocks.contains_key(&candidate) {
                self.last = candidate;
                return Some(candidate);
            }
        }
    }
}

#[derive(Debug)]
pub struct InMemoryGlobalHeap {
    heap: Mutex<Heap>,
    limit: usize,
}

impl Default for InMemoryGlobalHeap {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HEAP_LIMIT)
    }
}

impl InMemoryGlobalHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            heap: Mutex::new(Heap::default()),
            limit,
        }
    }

    /// Bytes held by live blocks.
    pub fn used(&self) -> usize {
        self.lock().used
    }

    pub fn block_count(&self) -> usize {
        self.lock().blocks.len()
    }

    fn lock(&self) -> MutexGuard<'_, Heap> {
        self.heap.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GlobalMemoryPort for InMemoryGlobalHeap {
    fn alloc(&self, size: usize) -> Option<GlobalHandle> {
        let mut heap = self.lock();
        if heap.used.saturating_add(size) > self.limit {
            tracing::debug!(size, used = heap.used, limit = self.limit, "global heap exhausted");
            return None;
        }
        let raw = heap.next_handle()?;
        heap.blocks.insert(raw, vec![0; size]);
        heap.used += size;
        tracing::trace!(handle = raw, size, "global alloc");
        GlobalHandle::new(raw)
    }

    fn read(&self, handle: GlobalHandle) -> Option<Vec<u8>> {
        self.lock().blocks.get(&handle.raw()).cloned()
    }

    fn write(&self, handle: GlobalHandle, bytes: &[u8]) -> bool {
        match self.lock().blocks.get_mut(&handle.raw()) {
            Some(block) if bytes.len() <= block.len() => {
                block[..bytes.len()].copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    fn size(&self, handle: GlobalHandle) -> usize {
        self.lock().blocks.get(&handle.raw()).map_or(0, Vec::len)
    }

    fn free(&self, handle: GlobalHandle) -> bool {
        let mut heap = self.lock();
        match heap.blocks.remove(&handle.raw()) {
            Some(block) => {
                heap.used -= block.len();
                tracing::trace!(%handle, size = block.len(), "global free");
                true
            }
            None => false,
        }
    }
}
