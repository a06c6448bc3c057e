mod code_page;

pub use code_page::CodePageCodec;
