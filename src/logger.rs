use std::fmt;
use std::process;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::warn;

use crate::buffer_pool::FIELD_BUFFERS;
use crate::clock;
use crate::codec;
use crate::config::Config;
use crate::error::Result;
use crate::field::Field;
use crate::level::Level;
use crate::sink::{Discard, Sink};

/// Size of the stack buffer used for records without fields.
pub const STACK_RECORD_SIZE: usize = 256;

/// Exit status of the process after a Fatal record has been dispatched.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Core of the logging engine: level filter, sequence counter and sink.
///
/// A `Logger` is shared freely between threads (`&Logger` or `Arc<Logger>`).
/// Its only mutable state is the minimum level, the sink handle and the
/// sequence counter, all of which are updated atomically without a mutex.
///
/// # Hot path
///
/// 1. An atomic load of the level; filtered calls return immediately, without
///    touching the sequence counter or allocating.
/// 2. The record is encoded into a 256-byte stack buffer, or into a pooled
///    1024-byte buffer when fields are attached.
/// 3. The current sink is loaded and handed the encoded slice.
/// 4. The pooled buffer, if any, goes back to the pool.
///
/// Fatal records terminate the process with exit status 1 once the sink has
/// returned.
///
/// # Examples
///
/// ```
/// use ultralog::{Field, Level, Logger, Discard};
///
/// let logger = Logger::with_sink(Discard);
/// logger.set_level(Level::Warn);
///
/// logger.info("not emitted", &[]);
/// logger.warn("disk almost full", &[Field::uint("free_mb", 512)]);
/// assert_eq!(logger.sequence(), 1);
/// ```
pub struct Logger {
    level: AtomicU8,
    sink: ArcSwap<Box<dyn Sink>>,
    sequence: AtomicU64,
}

impl Logger {
    /// Logger at `Info` that discards everything until a sink is set.
    pub fn new() -> Self {
        Self::with_sink(Discard)
    }

    pub fn with_sink(sink: impl Sink + 'static) -> Self {
        let sink: Box<dyn Sink> = Box::new(sink);
        Self {
            level: AtomicU8::new(Level::Info.as_u8()),
            sink: ArcSwap::from_pointee(sink),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn with_config(config: &Config, sink: impl Sink + 'static) -> Self {
        let logger = Self::with_sink(sink);
        logger.set_level(config.level);
        logger
    }

    #[inline]
    pub fn set_level(&self, level: Level) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    #[inline]
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or(Level::Info)
    }

    /// Replaces the sink. Calls that already loaded the old sink finish with
    /// it; every later call sees the new one.
    pub fn set_sink(&self, sink: impl Sink + 'static) {
        let sink: Box<dyn Sink> = Box::new(sink);
        self.sink.store(Arc::new(sink));
    }

    /// Sequence number of the most recently dispatched record (0 if none).
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        self.level.load(Ordering::Relaxed) <= level.as_u8()
    }

    /// Emits one record. Sink failures are reported through `tracing` and
    /// otherwise ignored; use [`Logger::try_log`] to observe them.
    #[inline]
    pub fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        if let Err(err) = self.try_log(level, message, fields) {
            warn!(error = %err, "log sink rejected record");
        }
    }

    /// Emits one record and returns the sink's result. Filtered calls return
    /// `Ok(())` without side effects.
    pub fn try_log(&self, level: Level, message: &str, fields: &[Field<'_>]) -> Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }

        let result = self.dispatch(level, message.as_bytes(), fields);

        if level == Level::Fatal {
            if let Err(err) = &result {
                warn!(error = %err, "log sink rejected fatal record");
            }
            process::exit(FATAL_EXIT_CODE);
        }

        result
    }

    fn dispatch(&self, level: Level, message: &[u8], fields: &[Field<'_>]) -> Result<()> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let timestamp = clock::now_nanos();

        if fields.is_empty() {
            let mut buf = [0u8; STACK_RECORD_SIZE];
            let len = codec::encode(&mut buf, level, sequence, timestamp, message, &[]);
            return self.sink.load().write(&buf[..len]);
        }

        let mut buf = FIELD_BUFFERS.checkout();
        let len = codec::encode(&mut buf, level, sequence, timestamp, message, fields);
        let result = self.sink.load().write(&buf[..len]);
        drop(buf);
        result
    }

    #[inline]
    pub fn debug(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Debug, message, fields);
    }

    #[inline]
    pub fn info(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Info, message, fields);
    }

    #[inline]
    pub fn warn(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Warn, message, fields);
    }

    #[inline]
    pub fn error(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Error, message, fields);
    }

    /// Logs at `Fatal` and terminates the process.
    pub fn fatal(&self, message: &str, fields: &[Field<'_>]) -> ! {
        self.log(Level::Fatal, message, fields);
        // `log` has already exited for Fatal records.
        process::exit(FATAL_EXIT_CODE)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("sequence", &self.sequence())
            .finish_non_exhaustive()
    }
}
