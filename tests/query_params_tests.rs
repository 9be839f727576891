//! Query parameter bundles driving a block read end to end

use blockscan_core::{DataType, QueryParams, ReaderConfig};
use blockscan_io::MemorySource;
use blockscan_reader::AsyncReader;
use serde_json::json;

const DATA: &[u8] = b"1,apple,0.5\n2,pear,1.25\n3,plum,2\n4,fig,3.5\n";

fn params(offset: u64, size: u64) -> QueryParams {
    let doc = json!({
        "query": "SELECT * FROM S3Object s WHERE s._2 <> 'pear'",
        "schema": "id INTEGER, name TEXT, price REAL",
        "block_offset": offset,
        "block_size": size,
    });
    QueryParams::from_json(&doc.to_string()).expect("params")
}

fn scan(params: &QueryParams) -> Vec<Vec<String>> {
    let schema = params.parse_schema().unwrap().expect("schema");
    let config = ReaderConfig {
        columns: Some(schema.len()),
        ..Default::default()
    };
    let range = params.block_range();
    let source = MemorySource::new(DATA.to_vec()).at_offset(range.offset);
    let mut reader = AsyncReader::open_block(source, &config, &range).unwrap();

    let mut out = Vec::new();
    while let Some(record) = reader.read_record().unwrap() {
        out.push(record.to_strings());
    }
    out
}

#[test]
fn test_schema_sets_column_count_and_types() {
    let schema = params(0, 0).parse_schema().unwrap().unwrap();
    assert_eq!(schema.len(), 3);
    assert_eq!(schema.field(0).unwrap().data_type, DataType::Int64);
    assert_eq!(schema.field(2).unwrap().data_type, DataType::Float64);
    assert_eq!(schema.index_of("name"), Some(1));
}

#[test]
fn test_unbounded_params_read_everything() {
    let records = scan(&params(0, 0));
    assert_eq!(records.len(), 4);
    assert_eq!(records[1], ["2", "pear", "1.25"]);
}

#[test]
fn test_two_blocks_from_params_cover_the_input() {
    let first = scan(&params(0, 20));
    let second = scan(&params(20, 100));
    assert_eq!(first.len() + second.len(), 4);
    assert_eq!(first.last().unwrap()[0], "2");
    assert_eq!(second[0][0], "3");
}
