use thiserror::Error;

/// Result type local to blockscan-reader.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] blockscan_core::Error),

    #[error(transparent)]
    Mem(#[from] blockscan_mem::error::Error),

    #[error(transparent)]
    Io(#[from] blockscan_io::Error),

    #[error("seek failed: no record delimiter in the {scanned} buffered bytes")]
    SeekFailed { scanned: usize },

    #[error("cannot detect column count: no record delimiter in the {scanned} buffered bytes")]
    ColumnDetection { scanned: usize },

    #[error("record {record} is incomplete: input ended while reading column {column}")]
    MalformedRecord { record: u64, column: usize },

    #[error("field in column {column} crosses a buffer boundary and exceeds the overflow capacity of {capacity} bytes")]
    FieldTooLarge { column: usize, capacity: usize },

    #[error("record needs {buffers} buffers at once, more than the pool of {queue_size}")]
    RecordSpansPool { buffers: usize, queue_size: usize },

    #[error("record layout not initialized; call init_record or detect_columns first")]
    RecordNotInitialized,

    #[error("record layout already initialized with {columns} columns")]
    RecordAlreadyInitialized { columns: usize },

    #[error("{0} is only valid before the first read_record call")]
    SetupAfterRead(&'static str),

    #[error("cannot start worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}
