mod manager;

pub use manager::{ClipboardMessageHandler, WindowError, WindowManager};
