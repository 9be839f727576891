//! Request bundle handed to a storage node: the query text, the schema of the
//! delimited data and the block the query is restricted to.

use serde::{Deserialize, Serialize};

use crate::block::BlockRange;
use crate::error::{Error, Result};
use crate::schema::Schema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Query text for the engine; opaque to the reader.
    pub query: String,
    /// Schema descriptor, see [`Schema::parse_descriptor`]. Empty means
    /// "detect the column count from the data".
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub block_offset: u64,
    /// 0 means unbounded.
    #[serde(default)]
    pub block_size: u64,
}

impl QueryParams {
    pub fn from_json(s: &str) -> Result<Self> {
        let params: QueryParams = serde_json::from_str(s)?;
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn block_range(&self) -> BlockRange {
        BlockRange::new(self.block_offset, self.block_size)
    }

    /// `None` when no schema was supplied.
    pub fn parse_schema(&self) -> Result<Option<Schema>> {
        if self.schema.trim().is_empty() {
            return Ok(None);
        }
        let schema = Schema::parse_descriptor(&self.schema)
            .map_err(|e| Error::Params(format!("schema: {e}")))?;
        Ok(Some(schema))
    }
}
