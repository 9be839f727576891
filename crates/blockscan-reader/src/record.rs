//! Per-session record layout and the borrowed view handed to callers.

use std::ffi::CStr;
use std::ops::Index;

use blockscan_mem::{FixedBuffer, MemoryBudget, Reservation};

use crate::error::{Error, Result};

/// Where a field's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Aliased in place inside a pooled buffer.
    Buffer { buffer: usize, offset: usize },
    /// Copied into the record's overflow arena.
    Overflow,
}

#[derive(Debug, Clone, Copy)]
enum FieldSpan {
    Unset,
    Buffer { buffer: usize, start: usize, len: usize },
    Overflow { len: usize },
}

/// Field slots for a fixed column count plus one overflow region of
/// `field_capacity` bytes per column. Reused for every record of a session.
pub struct Record {
    spans: Vec<FieldSpan>,
    field_capacity: usize,
    arena: Vec<u8>,
    _reservation: Reservation,
}

impl Record {
    pub fn new(columns: usize, field_capacity: usize, budget: &MemoryBudget) -> Result<Self> {
        if columns == 0 {
            return Err(blockscan_core::Error::Config("record needs at least one column".into()).into());
        }
        if field_capacity < 2 {
            return Err(blockscan_core::Error::Config(format!(
                "field_capacity must be at least 2, got {field_capacity}"
            ))
            .into());
        }
        let bytes = columns.checked_mul(field_capacity).ok_or_else(|| {
            blockscan_core::Error::Config("overflow arena size overflows usize".into())
        })?;
        let reservation = budget.reserve(bytes, "overflow_arena")?;
        Ok(Self {
            spans: vec![FieldSpan::Unset; columns],
            field_capacity,
            arena: vec![0; bytes],
            _reservation: reservation,
        })
    }

    pub fn columns(&self) -> usize {
        self.spans.len()
    }

    pub(crate) fn clear(&mut self) {
        self.spans.fill(FieldSpan::Unset);
    }

    pub(crate) fn set_borrowed(&mut self, column: usize, buffer: usize, start: usize, len: usize) {
        self.spans[column] = FieldSpan::Buffer { buffer, start, len };
    }

    pub(crate) fn start_overflow(&mut self, column: usize) {
        self.spans[column] = FieldSpan::Overflow { len: 0 };
    }

    /// Append to the column's overflow region, keeping one byte for the
    /// terminator.
    pub(crate) fn append_overflow(&mut self, column: usize, bytes: &[u8]) -> Result<()> {
        let len = match self.spans[column] {
            FieldSpan::Overflow { len } => len,
            _ => 0,
        };
        let next = len + bytes.len();
        if next > self.field_capacity - 1 {
            return Err(Error::FieldTooLarge {
                column,
                capacity: self.field_capacity,
            });
        }
        let base = column * self.field_capacity;
        self.arena[base + len..base + next].copy_from_slice(bytes);
        self.spans[column] = FieldSpan::Overflow { len: next };
        Ok(())
    }

    pub(crate) fn finish_overflow(&mut self, column: usize) {
        if let FieldSpan::Overflow { len } = self.spans[column] {
            self.arena[column * self.field_capacity + len] = 0;
        }
    }

    fn overflow(&self, column: usize, len: usize) -> &[u8] {
        let base = column * self.field_capacity;
        &self.arena[base..base + len]
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("columns", &self.columns())
            .field("field_capacity", &self.field_capacity)
            .finish()
    }
}

/// One record as returned by [`AsyncReader::read_record`]. Borrows the reader,
/// so its slices cannot outlive the next read.
///
/// [`AsyncReader::read_record`]: crate::AsyncReader::read_record
#[derive(Clone, Copy)]
pub struct RecordView<'a> {
    record: &'a Record,
    current: Option<&'a FixedBuffer>,
    held: &'a [FixedBuffer],
}

impl<'a> RecordView<'a> {
    pub(crate) fn new(
        record: &'a Record,
        current: Option<&'a FixedBuffer>,
        held: &'a [FixedBuffer],
    ) -> Self {
        Self {
            record,
            current,
            held,
        }
    }

    pub fn len(&self) -> usize {
        self.record.columns()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn buffer(&self, id: usize) -> Option<&'a FixedBuffer> {
        self.current
            .filter(|b| b.id() == id)
            .or_else(|| self.held.iter().find(|b| b.id() == id))
    }

    fn span(&self, column: usize, terminator: bool) -> Option<&'a [u8]> {
        let extra = usize::from(terminator);
        match *self.record.spans.get(column)? {
            FieldSpan::Unset => None,
            FieldSpan::Buffer { buffer, start, len } => {
                Some(self.buffer(buffer)?.slice(start, start + len + extra))
            }
            FieldSpan::Overflow { len } => Some(self.record.overflow(column, len + extra)),
        }
    }

    /// Exact field content, delimiter excluded.
    pub fn get(&self, column: usize) -> Option<&'a [u8]> {
        self.span(column, false)
    }

    /// Field content followed by its zero terminator.
    pub fn field_with_terminator(&self, column: usize) -> Option<&'a [u8]> {
        self.span(column, true)
    }

    /// The field as a C string. `None` if the column is out of range or the
    /// content itself contains a zero byte.
    pub fn as_c_str(&self, column: usize) -> Option<&'a CStr> {
        CStr::from_bytes_with_nul(self.field_with_terminator(column)?).ok()
    }

    pub fn source(&self, column: usize) -> Option<FieldSource> {
        match *self.record.spans.get(column)? {
            FieldSpan::Unset => None,
            FieldSpan::Buffer { buffer, start, .. } => Some(FieldSource::Buffer {
                buffer,
                offset: start,
            }),
            FieldSpan::Overflow { .. } => Some(FieldSource::Overflow),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let view = *self;
        (0..view.len()).map(move |i| view.get(i).unwrap_or_default())
    }

    /// Lossy UTF-8 copies of every field.
    pub fn to_strings(&self) -> Vec<String> {
        self.iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }
}

impl<'a> Index<usize> for RecordView<'a> {
    type Output = [u8];

    fn index(&self, column: usize) -> &[u8] {
        match self.get(column) {
            Some(f) => f,
            None => panic!("column {column} out of range for {} columns", self.len()),
        }
    }
}

impl std::fmt::Debug for RecordView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(String::from_utf8_lossy))
            .finish()
    }
}
