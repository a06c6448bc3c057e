use ek_core::ids::GlobalHandle;
use ek_core::ports::GdiObjectPort;

/// Graphics objects are not emulated; deleting one is only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGdi;

impl GdiObjectPort for NullGdi {
    fn delete_object(&self, handle: GlobalHandle) -> bool {
        tracing::debug!(%handle, "graphics object deletion is not emulated");
        false
    }
}
