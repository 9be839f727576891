//! Reader configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of pooled buffers.
pub const DEFAULT_QUEUE_SIZE: usize = 4;
/// Default capacity of a single pooled buffer (128 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 128 << 10;
/// Default per-column overflow region, terminator included.
pub const DEFAULT_FIELD_CAPACITY: usize = 1024;

/// Field, record and quote delimiter bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    #[serde(with = "delimiter_serde")]
    pub field: u8,
    #[serde(with = "delimiter_serde")]
    pub record: u8,
    #[serde(with = "delimiter_serde")]
    pub quote: u8,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: b',',
            record: b'\n',
            quote: b'"',
        }
    }
}

impl Delimiters {
    pub fn validate(&self) -> Result<()> {
        if self.field == self.record || self.field == self.quote || self.record == self.quote {
            return Err(Error::Config(format!(
                "delimiters must be distinct (field={}, record={}, quote={})",
                render_delimiter(self.field),
                render_delimiter(self.record),
                render_delimiter(self.quote)
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Number of buffers cycling between the worker and the tokenizer.
    pub queue_size: usize,

    /// Capacity of each buffer; also the maximum size of a single source read.
    pub buffer_size: usize,

    /// Per-column overflow region for fields that cross a buffer boundary.
    /// One byte of it is reserved for the terminator.
    pub field_capacity: usize,

    /// Byte limit of the block being read. 0 means unbounded.
    pub block_size: u64,

    /// Explicit column count; `None` detects it from the first record.
    pub columns: Option<usize>,

    /// Skip the first record of a block that starts at offset 0.
    pub skip_header: bool,

    /// Hard cap for pool and overflow-arena allocations.
    pub mem_cap_bytes: usize,

    pub delimiters: Delimiters,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            field_capacity: DEFAULT_FIELD_CAPACITY,
            block_size: 0,
            columns: None,
            skip_header: false,
            mem_cap_bytes: 64 * 1024 * 1024, // 64 MiB default
            delimiters: Delimiters::default(),
        }
    }
}

impl ReaderConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `BLOCKSCAN_QUEUE_SIZE`, `BLOCKSCAN_BUFFER_SIZE`, `BLOCKSCAN_FIELD_CAPACITY`
    /// - `BLOCKSCAN_BLOCK_SIZE`: byte limit (0 = unbounded)
    /// - `BLOCKSCAN_COLUMNS`: explicit column count
    /// - `BLOCKSCAN_SKIP_HEADER`: `true`/`false`/`1`/`0`
    /// - `BLOCKSCAN_MEM_CAP_BYTES`: memory cap in bytes
    /// - `BLOCKSCAN_FIELD_DELIMITER`, `BLOCKSCAN_RECORD_DELIMITER`, `BLOCKSCAN_QUOTE_DELIMITER`
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("BLOCKSCAN_QUEUE_SIZE").and_then(|s| s.parse().ok()) {
            self.queue_size = v;
        }
        if let Some(v) = lookup("BLOCKSCAN_BUFFER_SIZE").and_then(|s| s.parse().ok()) {
            self.buffer_size = v;
        }
        if let Some(v) = lookup("BLOCKSCAN_FIELD_CAPACITY").and_then(|s| s.parse().ok()) {
            self.field_capacity = v;
        }
        if let Some(v) = lookup("BLOCKSCAN_BLOCK_SIZE").and_then(|s| s.parse().ok()) {
            self.block_size = v;
        }
        if let Some(v) = lookup("BLOCKSCAN_COLUMNS").and_then(|s| s.parse().ok()) {
            self.columns = Some(v);
        }
        if let Some(v) = lookup("BLOCKSCAN_SKIP_HEADER").and_then(|s| parse_flag(&s)) {
            self.skip_header = v;
        }
        if let Some(v) = lookup("BLOCKSCAN_MEM_CAP_BYTES").and_then(|s| s.parse().ok()) {
            self.mem_cap_bytes = v;
        }
        if let Some(v) = lookup("BLOCKSCAN_FIELD_DELIMITER").and_then(|s| parse_delimiter(&s).ok()) {
            self.delimiters.field = v;
        }
        if let Some(v) = lookup("BLOCKSCAN_RECORD_DELIMITER").and_then(|s| parse_delimiter(&s).ok())
        {
            self.delimiters.record = v;
        }
        if let Some(v) = lookup("BLOCKSCAN_QUOTE_DELIMITER").and_then(|s| parse_delimiter(&s).ok()) {
            self.delimiters.quote = v;
        }
    }

    /// Parse a YAML document; keys that are absent keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: ReaderConfig = serde_yaml::from_str(yaml)?;
        Ok(cfg)
    }

    /// Overlay a YAML document on `self`: only the keys present in `yaml`
    /// change, nested mappings are merged key by key.
    pub fn merge_yaml_str(&self, yaml: &str) -> Result<Self> {
        let overlay: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let mut base = serde_yaml::to_value(self)?;
        merge_yaml(&mut base, overlay);
        Ok(serde_yaml::from_value(base)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_size < 2 {
            return Err(Error::Config(format!(
                "queue_size must be at least 2, got {}",
                self.queue_size
            )));
        }
        if self.buffer_size == 0 {
            return Err(Error::Config("buffer_size must be non-zero".into()));
        }
        if self.field_capacity < 2 {
            return Err(Error::Config(format!(
                "field_capacity must be at least 2, got {}",
                self.field_capacity
            )));
        }
        if self.columns == Some(0) {
            return Err(Error::Config("columns must be non-zero when set".into()));
        }
        self.delimiters.validate()
    }
}

fn merge_yaml(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    use serde_yaml::Value;
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (k, v) in overlay {
                match base.get_mut(&k) {
                    Some(slot) => merge_yaml(slot, v),
                    None => {
                        base.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a delimiter given as a single byte or one of `\n`, `\r`, `\t`, `\0`, `\\`.
pub fn parse_delimiter(s: &str) -> Result<u8> {
    match s {
        "\\n" => return Ok(b'\n'),
        "\\r" => return Ok(b'\r'),
        "\\t" => return Ok(b'\t'),
        "\\0" => return Ok(0),
        "\\\\" => return Ok(b'\\'),
        _ => {}
    }
    match s.as_bytes() {
        [b] => Ok(*b),
        _ => Err(Error::Config(format!(
            "delimiter must be a single byte or escape, got {s:?}"
        ))),
    }
}

/// Inverse of [`parse_delimiter`].
pub fn render_delimiter(b: u8) -> String {
    match b {
        b'\n' => "\\n".into(),
        b'\r' => "\\r".into(),
        b'\t' => "\\t".into(),
        0 => "\\0".into(),
        b'\\' => "\\\\".into(),
        other => (other as char).to_string(),
    }
}

mod delimiter_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(b: &u8, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::render_delimiter(*b))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        let s = String::deserialize(d)?;
        super::parse_delimiter(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let cfg = ReaderConfig::default();
        assert_eq!(cfg.queue_size, 4);
        assert_eq!(cfg.buffer_size, 128 * 1024);
        cfg.validate().unwrap();
    }

    #[test]
    fn env_overrides_defaults_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("BLOCKSCAN_QUEUE_SIZE", "8"),
            ("BLOCKSCAN_BUFFER_SIZE", "not-a-number"),
            ("BLOCKSCAN_BLOCK_SIZE", "4096"),
            ("BLOCKSCAN_SKIP_HEADER", "yes"),
            ("BLOCKSCAN_FIELD_DELIMITER", "\\t"),
        ]
        .into_iter()
        .collect();

        let mut cfg = ReaderConfig::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.queue_size, 8);
        assert_eq!(cfg.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(cfg.block_size, 4096);
        assert!(cfg.skip_header);
        assert_eq!(cfg.delimiters.field, b'\t');
    }

    #[test]
    fn yaml_keeps_defaults_for_missing_keys() {
        let cfg = ReaderConfig::from_yaml_str(
            r#"
buffer_size: 64
columns: 3
delimiters:
  field: "|"
  record: "\\n"
  quote: "'"
"#,
        )
        .unwrap();
        assert_eq!(cfg.buffer_size, 64);
        assert_eq!(cfg.columns, Some(3));
        assert_eq!(cfg.queue_size, DEFAULT_QUEUE_SIZE);
        assert_eq!(cfg.delimiters.field, b'|');
        assert_eq!(cfg.delimiters.record, b'\n');
        assert_eq!(cfg.delimiters.quote, b'\'');
    }

    #[test]
    fn yaml_overlay_only_touches_present_keys() {
        let base = ReaderConfig {
            queue_size: 8,
            columns: Some(5),
            ..Default::default()
        };
        let merged = base
            .merge_yaml_str("buffer_size: 256\ndelimiters:\n  field: \"\\t\"\n")
            .unwrap();
        assert_eq!(merged.queue_size, 8);
        assert_eq!(merged.columns, Some(5));
        assert_eq!(merged.buffer_size, 256);
        assert_eq!(merged.delimiters.field, b'\t');
        assert_eq!(merged.delimiters.record, b'\n');

        assert_eq!(base.merge_yaml_str("").unwrap(), base);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = ReaderConfig {
            queue_size: 1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        cfg.queue_size = 2;
        cfg.columns = Some(0);
        assert!(cfg.validate().is_err());

        cfg.columns = None;
        cfg.delimiters.quote = b',';
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn delimiter_escapes_round_trip() {
        for b in [b'\n', b'\t', b'\r', 0, b'\\', b',', b'|'] {
            assert_eq!(parse_delimiter(&render_delimiter(b)).unwrap(), b);
        }
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }
}
