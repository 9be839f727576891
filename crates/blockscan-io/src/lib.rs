#![forbid(unsafe_code)]
//! blockscan-io: byte sources for the block reader.
//!
//! The reader pulls bytes through [`ByteSource`] only. Positioning a source at
//! the start of a block is done here, before the reader is constructed.

pub mod error;
pub mod file;
pub mod memory;
pub mod source;

pub use error::{Error, Result};
pub use file::FileBlockSource;
pub use memory::MemorySource;
pub use source::ByteSource;
