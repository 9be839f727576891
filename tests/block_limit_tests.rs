//! Block-limit gating and splitting one input into consecutive blocks

use std::fs;
use std::path::PathBuf;

use blockscan_core::{BlockRange, ReaderConfig};
use blockscan_io::{FileBlockSource, MemorySource};
use blockscan_reader::AsyncReader;

fn block_config(columns: usize) -> ReaderConfig {
    ReaderConfig {
        buffer_size: 64,
        columns: Some(columns),
        ..Default::default()
    }
}

fn drain(reader: &mut AsyncReader) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    while let Some(record) = reader.read_record().expect("read_record failed") {
        out.push(record.to_strings());
    }
    out
}

/// Two unquoted columns of varying width, every record shorter than a buffer.
fn rows(n: usize) -> (Vec<u8>, Vec<Vec<String>>) {
    let rows: Vec<Vec<String>> = (0..n)
        .map(|i| vec![i.to_string(), "v".repeat(i * 7 % 31)])
        .collect();
    let data = rows
        .iter()
        .map(|r| r.join(",") + "\n")
        .collect::<String>()
        .into_bytes();
    (data, rows)
}

fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("blockscan-tests-{}-{name}", std::process::id()));
    fs::write(&path, bytes).expect("write temp file");
    path
}

#[test]
fn test_limit_gates_the_start_of_a_record() {
    let data = b"aaaa\nbbbb\ncccc\ndddd\n";
    for (limit, expected) in [(7u64, 2usize), (10, 3), (9, 2), (0, 4)] {
        let range = BlockRange::new(0, limit);
        let mut reader =
            AsyncReader::open_block(MemorySource::new(data.to_vec()), &block_config(1), &range)
                .unwrap();
        let got = drain(&mut reader);
        assert_eq!(got.len(), expected, "limit {limit}");
        assert!(reader.is_eof());
        assert_eq!(reader.block_limit_reached(), limit > 0 && expected < 4);
    }
}

#[test]
fn test_record_crossing_the_limit_completes() {
    let data = b"short\na-much-longer-record\nnext\n";
    let mut reader = AsyncReader::open_block(
        MemorySource::new(data.to_vec()),
        &block_config(1),
        &BlockRange::new(0, 8),
    )
    .unwrap();
    assert_eq!(
        drain(&mut reader),
        vec![vec!["short"], vec!["a-much-longer-record"]]
    );
    assert!(reader.bytes_consumed() > 8);
}

#[test]
fn test_memory_blocks_yield_every_record_once() {
    let (data, expected) = rows(300);
    let total = data.len() as u64;

    for block_size in [3u64, 7, 16, 33, 100, 1000, 100_000] {
        let mut got = Vec::new();
        for range in BlockRange::split(total, block_size) {
            let source = MemorySource::new(data.clone()).at_offset(range.offset);
            let mut reader = AsyncReader::open_block(source, &block_config(2), &range)
                .unwrap_or_else(|e| panic!("block {range:?}: {e}"));
            got.extend(drain(&mut reader));
        }
        assert_eq!(got, expected, "block size {block_size}");
    }
}

#[test]
fn test_file_blocks_yield_every_record_once() {
    let (data, expected) = rows(200);
    let path = temp_file("split.csv", &data);
    let total = fs::metadata(&path).unwrap().len();

    for block_size in [50u64, 257] {
        let mut got = Vec::new();
        for range in BlockRange::split(total, block_size) {
            let source = FileBlockSource::open_block(&path, &range).unwrap();
            let mut reader = AsyncReader::open_block(source, &block_config(2), &range).unwrap();
            got.extend(drain(&mut reader));
        }
        assert_eq!(got, expected, "block size {block_size}");
    }
    let _ = fs::remove_file(path);
}

#[test]
fn test_header_is_skipped_only_in_the_first_block() {
    let (body, expected) = rows(50);
    let mut data = b"id,payload\n".to_vec();
    data.extend_from_slice(&body);
    let config = ReaderConfig {
        skip_header: true,
        ..block_config(2)
    };

    let mut got = Vec::new();
    for range in BlockRange::split(data.len() as u64, 120) {
        let source = MemorySource::new(data.clone()).at_offset(range.offset);
        let mut reader = AsyncReader::open_block(source, &config, &range).unwrap();
        got.extend(drain(&mut reader));
    }
    assert_eq!(got, expected);
}

#[test]
fn test_worker_stops_reading_after_the_limit() {
    let data = b"x\n".repeat(512 * 1024);
    let config = ReaderConfig {
        buffer_size: 1024,
        queue_size: 4,
        block_size: 100,
        ..Default::default()
    };
    let mut reader = AsyncReader::new(MemorySource::new(data), &config).unwrap();
    reader.init_record(1).unwrap();

    assert_eq!(drain(&mut reader).len(), 51);
    assert!(reader.block_limit_reached());

    reader.shutdown();
    let stats = reader.stats();
    assert!(stats.buffers_filled <= 5, "filled {}", stats.buffers_filled);
    assert_eq!(reader.census().total(), 4);
}

#[test]
fn test_detected_columns_when_the_seek_drains_the_block() {
    // The second block starts on the final delimiter, so its seek consumes
    // everything the first read returned.
    let data = b"a,b\nc,d\n".to_vec();
    let mut got = Vec::new();
    for range in BlockRange::split(data.len() as u64, 7) {
        let source = MemorySource::new(data.clone()).at_offset(range.offset);
        let mut reader = AsyncReader::open_block(source, &ReaderConfig::default(), &range)
            .unwrap_or_else(|e| panic!("block {range:?}: {e}"));
        got.extend(drain(&mut reader));
        assert!(reader.is_eof());
    }
    assert_eq!(got, vec![vec!["a", "b"], vec!["c", "d"]]);
}

#[test]
fn test_detected_columns_across_block_splits() {
    let (data, expected) = rows(300);
    let total = data.len() as u64;

    for block_size in [3u64, 7, 16, 33, 100, 1000] {
        let mut got = Vec::new();
        for range in BlockRange::split(total, block_size) {
            let source = MemorySource::new(data.clone()).at_offset(range.offset);
            let mut reader = AsyncReader::open_block(source, &ReaderConfig::default(), &range)
                .unwrap_or_else(|e| panic!("block {range:?}: {e}"));
            got.extend(drain(&mut reader));
        }
        assert_eq!(got, expected, "block size {block_size}");
    }
}
