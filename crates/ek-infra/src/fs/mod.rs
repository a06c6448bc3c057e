mod native_fs;

pub use native_fs::{StdNativeFile, StdNativeFs};
