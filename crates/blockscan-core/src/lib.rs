#![forbid(unsafe_code)]
//! blockscan-core: configuration, block ranges, query parameters and schema
//! descriptors shared by every blockscan crate.
//!
//! Nothing in here spawns threads or touches IO; the pool lives in
//! `blockscan-mem`, byte sources in `blockscan-io`.

pub mod block;
pub mod config;
pub mod error;
pub mod params;
pub mod schema;

pub use block::BlockRange;
pub use config::{Delimiters, ReaderConfig};
pub use error::{Error, Result};
pub use params::QueryParams;
pub use schema::{DataType, Field, Schema};
