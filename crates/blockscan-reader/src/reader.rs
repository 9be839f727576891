//! The reader session.
//!
//! [`AsyncReader`] owns the consumer half of the buffer pool, the current
//! buffer, the record layout and the worker thread. Only the caller's thread
//! touches the current buffer, the held queue and the overflow arena.

use std::thread::JoinHandle;

use blockscan_core::{BlockRange, ReaderConfig};
use blockscan_io::ByteSource;
use blockscan_mem::{BufferPool, Census, FixedBuffer, MemoryBudget, PoolConsumer};

use crate::error::{Error, Result};
use crate::record::{Record, RecordView};
use crate::stats::ReaderStats;
use crate::tokenizer::Tokenizer;
use crate::worker::{ConsumedGate, Worker};

enum FieldEnd {
    Complete,
    /// Input ended after `partial` bytes of the field.
    Exhausted { partial: usize },
}

/// A failure that leaves the cursor inside a record. Once hit, every later
/// read reports it again.
#[derive(Debug, Clone, Copy)]
enum Failure {
    FieldTooLarge { column: usize, capacity: usize },
    RecordSpansPool { buffers: usize, queue_size: usize },
}

impl Failure {
    fn from_error(err: &Error) -> Option<Self> {
        match *err {
            Error::FieldTooLarge { column, capacity } => {
                Some(Failure::FieldTooLarge { column, capacity })
            }
            Error::RecordSpansPool {
                buffers,
                queue_size,
            } => Some(Failure::RecordSpansPool {
                buffers,
                queue_size,
            }),
            _ => None,
        }
    }
}

impl From<Failure> for Error {
    fn from(f: Failure) -> Self {
        match f {
            Failure::FieldTooLarge { column, capacity } => Error::FieldTooLarge { column, capacity },
            Failure::RecordSpansPool {
                buffers,
                queue_size,
            } => Error::RecordSpansPool {
                buffers,
                queue_size,
            },
        }
    }
}

pub struct AsyncReader {
    pool: PoolConsumer,
    current: Option<FixedBuffer>,
    /// A field of the record being read points into `current`.
    current_aliased: bool,
    exhausted: bool,
    tokenizer: Tokenizer,
    record: Option<Record>,
    budget: MemoryBudget,
    field_capacity: usize,
    block_size: u64,
    consumed: u64,
    records: u64,
    reading: bool,
    /// The block holds no record start; nothing to read.
    ended: bool,
    failure: Option<Failure>,
    gate: ConsumedGate,
    worker: Option<JoinHandle<()>>,
}

impl AsyncReader {
    /// Allocate the pool, start the worker and wait for the first buffer.
    ///
    /// The record layout is left uninitialized; call [`init_record`] or
    /// [`detect_columns`] before reading, or use [`open_block`] which does
    /// the whole setup.
    ///
    /// [`init_record`]: Self::init_record
    /// [`detect_columns`]: Self::detect_columns
    /// [`open_block`]: Self::open_block
    pub fn new<S: ByteSource + 'static>(source: S, config: &ReaderConfig) -> Result<Self> {
        config.validate()?;
        let budget = MemoryBudget::new(config.mem_cap_bytes);
        let (producer, pool) =
            BufferPool::allocate(config.queue_size, config.buffer_size, &budget)?;
        let gate = ConsumedGate::default();
        let worker = Worker::new(source, producer, gate.clone(), config.block_size)
            .spawn()
            .map_err(Error::WorkerSpawn)?;

        let mut reader = Self {
            pool,
            current: None,
            current_aliased: false,
            exhausted: false,
            tokenizer: Tokenizer::new(config.delimiters),
            record: None,
            budget,
            field_capacity: config.field_capacity,
            block_size: config.block_size,
            consumed: 0,
            records: 0,
            reading: false,
            ended: false,
            failure: None,
            gate,
            worker: Some(worker),
        };
        reader.pull_ready();
        Ok(reader)
    }

    /// Set up a reader for one block of a larger input whose `source` is
    /// already positioned at `range.offset`.
    ///
    /// A block past offset 0 starts inside a record owned by the previous
    /// block, so that partial record is skipped; at offset 0 the header is
    /// skipped when `config.skip_header` is set. A bounded range overrides
    /// `config.block_size`. The column count comes from `config.columns` or
    /// is detected from the first record.
    pub fn open_block<S: ByteSource + 'static>(
        source: S,
        config: &ReaderConfig,
        range: &BlockRange,
    ) -> Result<Self> {
        let mut config = config.clone();
        if range.is_bounded() {
            config.block_size = range.length;
        }
        let mut reader = Self::new(source, &config)?;
        if range.starts_mid_file() || config.skip_header {
            reader.seek_record()?;
        }
        match config.columns {
            Some(n) => reader.init_record(n)?,
            None => {
                reader.refill_if_drained()?;
                if reader.is_eof() {
                    tracing::debug!(
                        offset = range.offset,
                        skipped = reader.consumed,
                        "block holds no record start"
                    );
                    reader.ended = true;
                } else {
                    reader.detect_columns()?;
                }
            }
        }
        tracing::debug!(
            offset = range.offset,
            block_size = reader.block_size,
            skipped = reader.consumed,
            columns = reader.columns().unwrap_or(0),
            "block opened"
        );
        Ok(reader)
    }

    /// Replace a current buffer the seek drained, so detection sees the
    /// next record.
    fn refill_if_drained(&mut self) -> Result<()> {
        let drained = self.current.as_ref().map_or(false, |b| b.is_drained());
        if drained && !self.exhausted && !self.block_limit_reached() {
            self.next_buffer()?;
        }
        Ok(())
    }

    fn ensure_setup(&self, op: &'static str) -> Result<()> {
        if self.reading {
            return Err(Error::SetupAfterRead(op));
        }
        Ok(())
    }

    /// Allocate the record layout for `columns` columns.
    pub fn init_record(&mut self, columns: usize) -> Result<()> {
        if let Some(record) = &self.record {
            return Err(Error::RecordAlreadyInitialized {
                columns: record.columns(),
            });
        }
        self.record = Some(Record::new(columns, self.field_capacity, &self.budget)?);
        Ok(())
    }

    /// Count the fields of the next record in the current buffer without
    /// consuming anything.
    pub fn column_count(&self) -> Result<usize> {
        self.ensure_setup("column_count")?;
        let unread = self.current.as_ref().map(|b| b.unread()).unwrap_or_default();
        match self.tokenizer.count_fields(unread) {
            Some(n) => {
                tracing::info!(columns = n, "detected column count");
                Ok(n)
            }
            None => Err(Error::ColumnDetection {
                scanned: unread.len(),
            }),
        }
    }

    /// [`column_count`](Self::column_count) followed by
    /// [`init_record`](Self::init_record).
    pub fn detect_columns(&mut self) -> Result<usize> {
        let n = self.column_count()?;
        self.init_record(n)?;
        Ok(n)
    }

    /// Skip past the next record delimiter in the current buffer. The
    /// skipped bytes count as consumed.
    pub fn seek_record(&mut self) -> Result<()> {
        self.ensure_setup("seek_record")?;
        let Some(buf) = self.current.as_mut() else {
            tracing::warn!(scanned = 0, "seek failed: no buffered data");
            return Err(Error::SeekFailed { scanned: 0 });
        };
        let mut quoted = false;
        match self.tokenizer.find_record_end(buf.unread(), &mut quoted) {
            Some(off) => {
                buf.advance(off + 1);
                self.consumed += (off + 1) as u64;
                self.gate.publish(self.consumed);
                tracing::debug!(skipped = off + 1, "seeked to record boundary");
                Ok(())
            }
            None => {
                let scanned = buf.unread().len();
                tracing::warn!(scanned, "seek failed: no record delimiter in buffered data");
                Err(Error::SeekFailed { scanned })
            }
        }
    }

    /// True once consumed bytes exceed a non-zero block limit.
    pub fn block_limit_reached(&self) -> bool {
        self.block_size > 0 && self.consumed > self.block_size
    }

    /// True once no further record can be returned: the block limit was
    /// passed, or the source is exhausted and every buffered byte consumed.
    pub fn is_eof(&self) -> bool {
        self.block_limit_reached()
            || (self.exhausted && self.current.as_ref().map_or(true, |b| b.is_drained()))
    }

    /// Read the next record. `Ok(None)` at the end of the block or input.
    ///
    /// The returned view borrows the reader; its fields stay valid until the
    /// next call.
    pub fn read_record(&mut self) -> Result<Option<RecordView<'_>>> {
        if let Some(failure) = self.failure {
            return Err(failure.into());
        }
        if self.ended {
            return Ok(None);
        }
        let mut record = self.record.take().ok_or(Error::RecordNotInitialized)?;
        let outcome = self.fill_record(&mut record);
        self.record = Some(record);
        if !outcome? {
            return Ok(None);
        }
        self.records += 1;
        Ok(self.view())
    }

    /// Returns false at a clean end of input.
    fn fill_record(&mut self, record: &mut Record) -> Result<bool> {
        self.reading = true;
        self.gate.publish(self.consumed);
        if self.block_limit_reached() {
            tracing::trace!(consumed = self.consumed, "block limit reached");
            return Ok(false);
        }
        self.pool.release_held();
        self.current_aliased = false;
        record.clear();

        for column in 0..record.columns() {
            let end = match self.read_field(record, column) {
                Ok(end) => end,
                Err(e) => {
                    self.failure = Failure::from_error(&e);
                    return Err(e);
                }
            };
            match end {
                FieldEnd::Complete => {}
                FieldEnd::Exhausted { partial: 0 } if column == 0 => return Ok(false),
                FieldEnd::Exhausted { partial } => {
                    tracing::debug!(record = self.records + 1, column, partial, "incomplete record");
                    return Err(Error::MalformedRecord {
                        record: self.records + 1,
                        column,
                    });
                }
            }
        }
        Ok(true)
    }

    fn read_field(&mut self, record: &mut Record, column: usize) -> Result<FieldEnd> {
        let mut quoted = false;

        if let Some(buf) = self.current.as_mut() {
            let start = buf.pos();
            if let Some(off) = self.tokenizer.find_field_end(buf.unread(), &mut quoted) {
                buf.terminate(start + off);
                buf.advance(off + 1);
                self.consumed += (off + 1) as u64;
                record.set_borrowed(column, buf.id(), start, off);
                self.current_aliased = true;
                return Ok(FieldEnd::Complete);
            }
        }

        // Field runs past the current buffer: copy it into the overflow arena.
        record.start_overflow(column);
        let mut copied = 0usize;
        loop {
            if let Some(buf) = self.current.as_mut() {
                let tail = buf.unread().len();
                record.append_overflow(column, buf.unread())?;
                buf.advance(tail);
                self.consumed += tail as u64;
                copied += tail;
            }
            if !self.next_buffer()? {
                return Ok(FieldEnd::Exhausted { partial: copied });
            }
            let Some(buf) = self.current.as_mut() else {
                return Ok(FieldEnd::Exhausted { partial: copied });
            };
            if let Some(off) = self.tokenizer.find_field_end(buf.unread(), &mut quoted) {
                record.append_overflow(column, &buf.unread()[..off])?;
                buf.advance(off + 1);
                self.consumed += (off + 1) as u64;
                record.finish_overflow(column);
                return Ok(FieldEnd::Complete);
            }
        }
    }

    /// Retire the current buffer and wait for the next one. Returns false
    /// when the source has nothing more.
    fn next_buffer(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if let Some(old) = self.current.take() {
            if self.current_aliased {
                let held = self.pool.held().len();
                if held + 1 >= self.pool.queue_size() {
                    self.current = Some(old);
                    return Err(Error::RecordSpansPool {
                        buffers: held + 2,
                        queue_size: self.pool.queue_size(),
                    });
                }
                self.pool.hold(old);
            } else {
                self.pool.release_free(old);
            }
        }
        self.current_aliased = false;
        Ok(self.pull_ready())
    }

    fn pull_ready(&mut self) -> bool {
        match self.pool.acquire_ready() {
            Some(buf) => {
                let has_data = buf.readable() > 0;
                self.current = Some(buf);
                if !has_data {
                    self.exhausted = true;
                }
                has_data
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    fn view(&self) -> Option<RecordView<'_>> {
        let record = self.record.as_ref()?;
        Some(RecordView::new(
            record,
            self.current.as_ref(),
            self.pool.held(),
        ))
    }

    pub fn columns(&self) -> Option<usize> {
        self.record.as_ref().map(Record::columns)
    }

    pub fn records_read(&self) -> u64 {
        self.records
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// 0 means unbounded.
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn census(&self) -> Census {
        self.pool.census(usize::from(self.current.is_some()))
    }

    pub fn stats(&self) -> ReaderStats {
        ReaderStats::new(self.records, self.consumed, self.pool.stats())
    }

    /// Stop and join the worker. Idempotent; also run on drop.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.pool.signal_shutdown();
        if worker.join().is_err() {
            tracing::warn!("worker thread panicked");
        }
        tracing::debug!(stats = %self.stats(), "reader shut down");
    }
}

impl Drop for AsyncReader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AsyncReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncReader")
            .field("columns", &self.columns())
            .field("block_size", &self.block_size)
            .field("consumed", &self.consumed)
            .field("records", &self.records)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
