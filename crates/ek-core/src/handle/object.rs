//! Kernel object envelope and borrow guard.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::file::FileObject;

/// Kind tag of a kernel object.
///
/// Only [`ObjectKind::File`] has a body today; the remaining tags are
/// reserved so lookups against them fail the way a kind mismatch does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Semaphore,
    Event,
    Mutex,
    Process,
    Thread,
    File,
    ChangeNotification,
    Console,
    FileMapping,
    Pipe,
}

/// Per-kind capability the object manager delegates to.
pub trait KernelObjectBody: Send + Sync {
    fn kind(&self) -> ObjectKind;

    /// Release native resources and owned strings. Called exactly once, when
    /// the object's reference count reaches zero.
    fn destroy(&self);
}

/// Tagged set of object variants.
pub enum KernelObject {
    File(FileObject),
}

impl KernelObject {
    fn body(&self) -> &dyn KernelObjectBody {
        match self {
            KernelObject::File(file) => file,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.body().kind()
    }

    pub fn as_file(&self) -> Option<&FileObject> {
        match self {
            KernelObject::File(file) => Some(file),
        }
    }
}

impl fmt::Debug for KernelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelObject::File(file) => f.debug_tuple("File").field(file).finish(),
        }
    }
}

impl From<FileObject> for KernelObject {
    fn from(file: FileObject) -> Self {
        KernelObject::File(file)
    }
}

/// Common header `{kind, refcount}` plus the object body.
#[derive(Debug)]
pub(crate) struct ObjectEntry {
    kind: ObjectKind,
    refcount: AtomicUsize,
    destroyed: AtomicBool,
    body: KernelObject,
}

impl ObjectEntry {
    pub(crate) fn new(body: KernelObject) -> Arc<Self> {
        Arc::new(Self {
            kind: body.kind(),
            refcount: AtomicUsize::new(0),
            destroyed: AtomicBool::new(false),
            body,
        })
    }

    pub(crate) fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub(crate) fn refcount(&self) -> usize {
        self.refcount.load(Ordering::Acquire)
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn inc_ref(&self) {
        self.refcount.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop one reference; the last one runs the kind destructor.
    pub(crate) fn dec_ref(&self) {
        let previous = self.refcount.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "refcount underflow on {:?}", self.kind);
        if previous == 1 {
            self.destroy();
        }
    }

    /// Run the destructor unless it already ran.
    pub(crate) fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::AcqRel) {
            tracing::trace!(kind = ?self.kind, "destroying kernel object");
            self.body.body().destroy();
        }
    }
}

/// Transient borrow of the object behind a handle.
///
/// Holding an `ObjectRef` counts as one reference, so the object cannot be
/// destroyed underneath the borrower. Dropping it (or calling
/// [`ObjectRef::release`]) ends the borrow.
pub struct ObjectRef {
    entry: Arc<ObjectEntry>,
}

impl ObjectRef {
    pub(crate) fn acquire(entry: &Arc<ObjectEntry>) -> Self {
        entry.inc_ref();
        Self {
            entry: Arc::clone(entry),
        }
    }

    pub(crate) fn entry(&self) -> &Arc<ObjectEntry> {
        &self.entry
    }

    pub fn kind(&self) -> ObjectKind {
        self.entry.kind()
    }

    pub fn object(&self) -> &KernelObject {
        &self.entry.body
    }

    pub fn as_file(&self) -> Option<&FileObject> {
        self.entry.body.as_file()
    }

    /// Current reference count, including this borrow.
    pub fn refcount(&self) -> usize {
        self.entry.refcount()
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        self.entry.dec_ref();
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("kind", &self.kind())
            .field("refcount", &self.refcount())
            .finish()
    }
}
