mod global_heap;

pub use global_heap::InMemoryGlobalHeap;
