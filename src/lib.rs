#![forbid(unsafe_code)]
//! blockscan: reads the delimited records of one storage block with a
//! double-buffered worker thread.
//!
//! This crate re-exports the workspace crates' main types; see
//! `blockscan-reader` for the reader itself.

pub use blockscan_core::{BlockRange, DataType, Delimiters, QueryParams, ReaderConfig, Schema};
pub use blockscan_io::{ByteSource, FileBlockSource, MemorySource};
pub use blockscan_mem::{Census, MemoryBudget};
pub use blockscan_reader::{
    AsyncReader, Error, FieldSource, ReaderStats, RecordView, Result, Tokenizer,
};
