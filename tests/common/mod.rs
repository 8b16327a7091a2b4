#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use ultralog::{Result, Sink};

/// Routes the crate's own diagnostics to the test harness output.
/// Set `RUST_LOG=ultralog=trace` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Sink that keeps a copy of every record it receives.
#[derive(Clone, Default)]
pub struct Capture {
    records: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Vec<u8>> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn bytes(&self) -> usize {
        self.records.lock().iter().map(Vec::len).sum()
    }
}

impl Sink for Capture {
    fn write(&self, record: &[u8]) -> Result<()> {
        self.records.lock().push(record.to_vec());
        Ok(())
    }
}

/// Encodes a record into a right-sized vector.
pub fn encode(level: ultralog::Level, seq: u64, message: &[u8], fields: &[ultralog::Field<'_>]) -> Vec<u8> {
    let mut buf = vec![0u8; 1024];
    let n = ultralog::encode(&mut buf, level, seq, 0, message, fields);
    buf.truncate(n);
    buf
}
