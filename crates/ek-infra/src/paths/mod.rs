//! DOS path translation onto the native file system.

mod resolver;
mod short_name;

pub use resolver::DosPathResolver;
pub use short_name::{is_short_name, short_name};
