//! # Ultralog
//!
//! A structured logging engine built around a compact binary record format:
//!
//! * **Bounded hot path**: a level check, one encode into a fixed buffer and a
//!   single sink call; no allocation in steady state
//! * **Total order**: every record carries a process-wide sequence number
//! * **Pluggable sinks**: render to a terminal or logfmt, persist into a
//!   memory-mapped circular file, or hand off to a background thread
//!
//! ## Main Components
//!
//! * [`Logger`]: level filter, sequence counter and swappable sink
//! * [`codec`]: the wire format (`encode` / `decode`)
//! * [`RingBuffer`] and [`AsyncWriter`]: lock-free queue and the sink built on it
//! * [`MmapWriter`]: circular region in a mapped file
//! * [`TerminalRenderer`] and [`LogfmtRenderer`]: text output
//! * [`RecordReader`]: walks records persisted by the mmap writer
//!
//! ## Quick Start
//!
//! ```
//! use ultralog::{Field, Level, Logger, TerminalRenderer};
//!
//! let logger = Logger::with_sink(TerminalRenderer::new(std::io::sink(), false));
//! logger.set_level(Level::Debug);
//!
//! logger.info("service started", &[Field::str("env", "prod"), Field::int("pid", 123)]);
//! logger.debug("cache warm", &[Field::float64("hit_ratio", 0.97)]);
//! ```

pub mod async_writer;
pub mod buffer_pool;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod facade;
pub mod field;
pub mod level;
pub mod log_reader;
pub mod logger;
pub mod mmap_writer;
pub mod render;
pub mod ring_buffer;
pub mod sink;

pub use async_writer::AsyncWriter;
pub use codec::{decode, encode, DecodedRecord, MalformedField};
pub use config::{ColorMode, Config};
pub use error::{ConfigError, DecodeError, Error, Result};
pub use field::{Field, FieldType, Value};
pub use level::Level;
pub use log_reader::RecordReader;
pub use logger::Logger;
pub use mmap_writer::MmapWriter;
pub use render::{LogfmtRenderer, TerminalRenderer};
pub use ring_buffer::RingBuffer;
pub use sink::{Discard, IoSink, Sink};
