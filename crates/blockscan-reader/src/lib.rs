#![forbid(unsafe_code)]
//! blockscan-reader: a double-buffered reader that turns one storage block of
//! delimited text into records.
//!
//! A background worker fills pooled buffers from a [`ByteSource`]; the
//! [`AsyncReader`] on the caller's thread splits them into quote-aware fields
//! and hands out a [`RecordView`] per record. Fields that fit in one buffer
//! are borrowed from it; fields that cross a buffer boundary are copied into
//! the record's overflow arena.
//!
//! ```no_run
//! use blockscan_core::{BlockRange, ReaderConfig};
//! use blockscan_io::FileBlockSource;
//! use blockscan_reader::AsyncReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let range = BlockRange::new(0, 128 << 20);
//! let source = FileBlockSource::open_block("data.csv", &range)?;
//! let mut reader = AsyncReader::open_block(source, &ReaderConfig::default(), &range)?;
//! while let Some(record) = reader.read_record()? {
//!     println!("{:?}", record.to_strings());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`ByteSource`]: blockscan_io::ByteSource

pub mod error;
pub mod reader;
pub mod record;
pub mod stats;
pub mod tokenizer;
mod worker;

pub use error::{Error, Result};
pub use reader::AsyncReader;
pub use record::{FieldSource, Record, RecordView};
pub use stats::ReaderStats;
pub use tokenizer::Tokenizer;
