use std::env;
use std::fs::{self, File};
use std::process::Command;

use tempfile::tempdir;
use ultralog::{decode, Field, IoSink, Level, Logger};

const CHILD_ENV: &str = "ULTRALOG_FATAL_CHILD";

/// Re-runs this test binary filtered to `test_name`, with the child branch
/// enabled, and returns the exit code.
fn run_child(test_name: &str, out: &str) -> Option<i32> {
    let status = Command::new(env::current_exe().unwrap())
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, out)
        .status()
        .unwrap();
    status.code()
}

#[test]
fn test_fatal_exits_with_status_1() {
    if let Ok(path) = env::var(CHILD_ENV) {
        let logger = Logger::with_sink(IoSink::new(File::create(path).unwrap()));
        logger.fatal("fatal error", &[Field::str("key", "value")]);
    }

    let dir = tempdir().unwrap();
    let out = dir.path().join("fatal.bin");
    let code = run_child("test_fatal_exits_with_status_1", out.to_str().unwrap());
    assert_eq!(code, Some(1));

    // The record reached the sink before the process exited.
    let data = fs::read(&out).unwrap();
    let record = decode(&data).unwrap();
    assert_eq!(record.level(), Some(Level::Fatal));
    assert_eq!(record.message, b"fatal error");
}

#[test]
fn test_fatal_after_filtered_record() {
    if let Ok(path) = env::var(CHILD_ENV) {
        let logger = Logger::with_sink(IoSink::new(File::create(path).unwrap()));
        logger.set_level(Level::Fatal);
        logger.error("filtered", &[]);
        logger.log(Level::Fatal, "bye", &[]);
        // Not reached.
        std::process::exit(0);
    }

    let dir = tempdir().unwrap();
    let out = dir.path().join("fatal.bin");
    let code = run_child("test_fatal_after_filtered_record", out.to_str().unwrap());
    assert_eq!(code, Some(1));

    let data = fs::read(&out).unwrap();
    let record = decode(&data).unwrap();
    assert_eq!(record.message, b"bye");
    assert_eq!(record.sequence, 1);
}
