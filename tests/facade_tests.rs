mod common;

use common::Capture;
use ultralog::{decode, facade, Field, Level, Logger};

// `log` accepts one global logger per process, so everything that goes through
// `facade::init` lives in this single test. No tracing subscriber is installed
// here: its `log` bridge would claim the global slot first.
#[test]
fn test_init_follows_later_level_changes() {
    let capture = Capture::new();
    let logger = facade::init(Logger::with_sink(capture.clone())).unwrap();
    assert_eq!(logger.level(), Level::Info);

    log::debug!("hidden");
    assert_eq!(capture.len(), 0);

    logger.set_level(Level::Debug);
    assert!(log::log_enabled!(log::Level::Debug));
    log::debug!(target: "net", "handshake {}", 3);
    log::trace!("folded into debug");

    logger.set_level(Level::Error);
    assert!(!log::log_enabled!(log::Level::Warn));
    log::warn!("hidden again");
    log::error!("kept");

    let records = capture.records();
    let messages: Vec<(Option<Level>, Vec<u8>)> = records
        .iter()
        .map(|r| {
            let record = decode(r).unwrap();
            (record.level(), record.message.to_vec())
        })
        .collect();
    assert_eq!(
        messages,
        vec![
            (Some(Level::Debug), b"handshake 3".to_vec()),
            (Some(Level::Debug), b"folded into debug".to_vec()),
            (Some(Level::Error), b"kept".to_vec()),
        ]
    );

    let first = decode(&records[0]).unwrap();
    let target = first.fields().next().unwrap().unwrap();
    assert_eq!(target, Field::str("target", "net"));

    // A second backend cannot replace the first.
    assert!(facade::init(Logger::new()).is_err());
}
