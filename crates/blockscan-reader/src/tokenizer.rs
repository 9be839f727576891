//! Quote-aware delimiter scanning.
//!
//! Quote bytes only toggle state; they are never stripped. Field and record
//! delimiters count only outside a quoted region. The quote state is passed in
//! by the caller so a scan can resume in the next buffer.

use blockscan_core::Delimiters;
use memchr::{memchr2_iter, memchr3_iter};

#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    delims: Delimiters,
}

impl Tokenizer {
    pub fn new(delims: Delimiters) -> Self {
        Self { delims }
    }

    /// Offset of the first field or record delimiter outside quotes.
    pub fn find_field_end(&self, bytes: &[u8], quoted: &mut bool) -> Option<usize> {
        let d = &self.delims;
        for pos in memchr3_iter(d.field, d.record, d.quote, bytes) {
            if bytes[pos] == d.quote {
                *quoted = !*quoted;
            } else if !*quoted {
                return Some(pos);
            }
        }
        None
    }

    /// Offset of the first record delimiter outside quotes.
    pub fn find_record_end(&self, bytes: &[u8], quoted: &mut bool) -> Option<usize> {
        let d = &self.delims;
        for pos in memchr2_iter(d.record, d.quote, bytes) {
            if bytes[pos] == d.quote {
                *quoted = !*quoted;
            } else if !*quoted {
                return Some(pos);
            }
        }
        None
    }

    /// Number of fields in the first complete record of `bytes`, or `None`
    /// if no record delimiter appears outside quotes.
    pub fn count_fields(&self, bytes: &[u8]) -> Option<usize> {
        let d = &self.delims;
        let mut quoted = false;
        let mut separators = 0;
        for pos in memchr3_iter(d.field, d.record, d.quote, bytes) {
            match bytes[pos] {
                b if b == d.quote => quoted = !quoted,
                _ if quoted => {}
                b if b == d.field => separators += 1,
                _ => return Some(separators + 1),
            }
        }
        None
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(Delimiters::default())
    }
}
