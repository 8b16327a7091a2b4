mod common;

use std::fs::{self, File};

use common::encode;
use tempfile::tempdir;
use ultralog::{Field, IoSink, Level, Logger, RecordReader};

fn concat(records: &[Vec<u8>]) -> Vec<u8> {
    records.iter().flatten().copied().collect()
}

#[test]
fn test_reads_back_to_back_records() {
    let records: Vec<Vec<u8>> = (1..=5)
        .map(|seq| encode(Level::Info, seq, b"entry", &[Field::uint("seq", seq)]))
        .collect();
    let data = concat(&records);

    let mut reader = RecordReader::new(&data);
    let seqs: Vec<u64> = reader.by_ref().map(|r| r.sequence).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    assert_eq!(reader.position(), data.len());
    assert_eq!(reader.skipped(), 0);
}

#[test]
fn test_resyncs_after_torn_record() {
    let first = encode(Level::Info, 1, b"whole", &[]);
    let torn = encode(Level::Warn, 2, b"overwritten", &[Field::int("x", 1)]);
    let last = encode(Level::Error, 3, b"after", &[]);

    // Keep only the tail of the middle record, as left behind by a wrap.
    let mut data = first.clone();
    data.extend_from_slice(&torn[10..]);
    data.extend_from_slice(&last);

    let mut reader = RecordReader::new(&data);
    let seqs: Vec<u64> = reader.by_ref().map(|r| r.sequence).collect();
    assert_eq!(seqs, vec![1, 3]);
    assert_eq!(reader.skipped(), torn.len() - 10);
}

#[test]
fn test_truncated_final_record_is_still_reported() {
    let mut data = encode(Level::Info, 1, b"one", &[]);
    let second = encode(Level::Info, 2, b"two", &[Field::str("k", "value")]);
    data.extend_from_slice(&second[..second.len() - 4]);

    let records: Vec<_> = RecordReader::new(&data).collect();
    assert_eq!(records.len(), 2);
    let field = records[1].fields().next().unwrap();
    assert!(field.is_err());
}

#[test]
fn test_circular_read_starts_at_head() {
    let b = encode(Level::Info, 2, b"b", &[]);
    let c = encode(Level::Info, 3, b"c", &[]);
    // `c` was written at 0 after a wrap; `b` survives from the previous lap.
    let mut region = c.clone();
    region.extend_from_slice(&b);
    let head = c.len();

    let seqs: Vec<u64> = RecordReader::circular(&region, head).map(|r| r.sequence).collect();
    assert_eq!(seqs, vec![2, 3]);
}

#[test]
fn test_io_sink_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.bin");
    {
        let logger = Logger::with_sink(IoSink::new(File::create(&path).unwrap()));
        logger.warn("low memory", &[Field::uint("free_kb", 512)]);
        logger.info("recovered", &[]);
    }

    let data = fs::read(&path).unwrap();
    let messages: Vec<&[u8]> = RecordReader::new(&data).map(|r| r.message).collect();
    assert_eq!(messages, vec![&b"low memory"[..], &b"recovered"[..]]);
}
