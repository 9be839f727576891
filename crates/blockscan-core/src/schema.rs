//! Schema descriptors handed over with a query. Pure data; the reader only
//! needs the column count, the query engine needs names and type affinities.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int64,
    Float64,
    Utf8,
    Binary,
}

impl DataType {
    /// Map a declared column type to an affinity, SQLite style: the first
    /// matching substring wins, unknown declarations fall back to text.
    pub fn from_declared(decl: &str) -> Self {
        let upper = decl.to_ascii_uppercase();
        if upper.contains("INT") {
            DataType::Int64
        } else if upper.contains("BOOL") {
            DataType::Boolean
        } else if upper.contains("CHAR")
            || upper.contains("CLOB")
            || upper.contains("TEXT")
            || upper.contains("STRING")
        {
            DataType::Utf8
        } else if upper.contains("BLOB") {
            DataType::Binary
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            DataType::Float64
        } else {
            DataType::Utf8
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Parse `"id INTEGER, name TEXT, note"`. Each entry is a column name
    /// optionally followed by a declared type.
    pub fn parse_descriptor(desc: &str) -> Result<Self> {
        let mut fields = Vec::new();
        for (idx, part) in desc.split(',').enumerate() {
            let part = part.trim();
            if part.is_empty() {
                return Err(Error::Schema(format!("empty column definition at {idx}")));
            }
            let (name, decl) = match part.split_once(char::is_whitespace) {
                Some((name, decl)) => (name, decl.trim()),
                None => (part, ""),
            };
            if fields.iter().any(|f: &Field| f.name == name) {
                return Err(Error::Schema(format!("duplicate column '{name}'")));
            }
            fields.push(Field::new(name, DataType::from_declared(decl)));
        }
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}
