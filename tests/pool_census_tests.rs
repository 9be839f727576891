//! Buffer accounting across the pool and the reader, and memory-cap enforcement

use blockscan_core::ReaderConfig;
use blockscan_io::MemorySource;
use blockscan_mem::error::Error as MemError;
use blockscan_reader::{AsyncReader, Error};

fn small(queue_size: usize) -> ReaderConfig {
    ReaderConfig {
        queue_size,
        buffer_size: 8,
        ..Default::default()
    }
}

#[test]
fn test_census_totals_queue_size_after_shutdown() {
    let data = b"a,bb,ccc\n".repeat(100);

    // Shut down at different points: before reading, mid-stream, after EOF.
    for (queue_size, reads) in [(2usize, 0usize), (3, 1), (4, 17), (5, 100), (4, 101)] {
        let mut reader = AsyncReader::new(MemorySource::new(data.clone()), &small(queue_size)).unwrap();
        reader.init_record(3).unwrap();
        for _ in 0..reads {
            if reader.read_record().unwrap().is_none() {
                break;
            }
        }
        reader.shutdown();
        let census = reader.census();
        assert_eq!(census.total(), queue_size, "{census:?}");
        assert_eq!(census.filling, 0);
    }
}

#[test]
fn test_held_buffers_are_released_at_the_next_record() {
    // A record covering several 8-byte buffers leaves earlier ones held.
    let data = b"a,b,c,d,eeeeeeeeeeee,f\ng,h,i,j,k,l\n";
    let mut reader = AsyncReader::new(MemorySource::new(data.to_vec()), &small(4)).unwrap();
    reader.init_record(6).unwrap();

    assert!(reader.read_record().unwrap().is_some());
    let held_after_first = reader.census().held;
    assert_eq!(held_after_first, 1);

    assert!(reader.read_record().unwrap().is_some());
    reader.shutdown();
    assert_eq!(reader.census().total(), 4);
}

#[test]
fn test_stats_account_for_every_byte() {
    let data = b"a,b\n".repeat(50);
    let config = ReaderConfig {
        buffer_size: 64,
        ..Default::default()
    };
    let mut reader = AsyncReader::new(MemorySource::new(data.clone()), &config).unwrap();
    reader.init_record(2).unwrap();
    while reader.read_record().unwrap().is_some() {}
    reader.shutdown();

    let stats = reader.stats();
    assert_eq!(stats.records_read, 50);
    assert_eq!(stats.bytes_consumed, 200);
    assert_eq!(stats.bytes_filled, 200);
    // 64 + 64 + 64 + 8, then the empty buffer that signals exhaustion.
    assert_eq!(stats.buffers_filled, 5);
    assert!(stats.buffers_released >= 3);
    assert!(stats.to_string().contains("records=50"));
}

#[test]
fn test_pool_over_memory_cap_fails_at_construction() {
    let config = ReaderConfig {
        queue_size: 4,
        buffer_size: 1024,
        mem_cap_bytes: 2048,
        ..Default::default()
    };
    let err = AsyncReader::new(MemorySource::new(b"a\n".to_vec()), &config).unwrap_err();
    assert!(matches!(
        err,
        Error::Mem(MemError::BudgetExceeded {
            requested: 4096,
            capacity: 2048,
            ..
        })
    ));
}

#[test]
fn test_arena_over_memory_cap_fails_at_init() {
    let config = ReaderConfig {
        queue_size: 2,
        buffer_size: 1024,
        field_capacity: 1024,
        mem_cap_bytes: 2048 + 4 * 1024,
        ..Default::default()
    };
    let mut reader =
        AsyncReader::new(MemorySource::new(b"a,b,c,d\n".to_vec()), &config).unwrap();
    assert!(matches!(
        reader.init_record(5),
        Err(Error::Mem(MemError::BudgetExceeded { tag: "overflow_arena", .. }))
    ));
    reader.init_record(4).unwrap();
    assert_eq!(reader.read_record().unwrap().unwrap().to_strings(), ["a", "b", "c", "d"]);
}

#[test]
fn test_invalid_config_is_rejected_before_spawning() {
    let config = ReaderConfig {
        queue_size: 1,
        ..Default::default()
    };
    let err = AsyncReader::new(MemorySource::new(Vec::new()), &config).unwrap_err();
    assert!(matches!(err, Error::Core(blockscan_core::Error::Config(_))));
}
