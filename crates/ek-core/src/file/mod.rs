//! File objects and the operations built on them.

mod info;
mod object;
mod open_file;
mod service;
mod temp_name;
mod time;

pub use info::{FileAttributes, FileInfo, FileTimes};
pub use object::{FileObject, FileType};
pub use open_file::{OfStruct, OpenFileFlags, OpenFileOutcome};
pub use service::{FileSystem, SeekOrigin, COPY_CHUNK_SIZE};
pub use temp_name::TempName;
pub use time::{compare_file_time, DosDateTime, FileTime};

#[cfg(test)]
mod tests;
