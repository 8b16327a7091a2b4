//! Bridge from the `log` crate's macros to a [`Logger`].
//!
//! `log::Record` arguments are formatted straight into a stack buffer sized to
//! the message cap, so bridged calls keep the allocation-free hot path. Long
//! messages are cut at the cap on a character boundary. The record's target is
//! attached as a `target` field.

use std::fmt::{self, Write};
use std::str;

use crate::codec::MAX_MESSAGE_LEN;
use crate::error::Result;
use crate::field::Field;
use crate::level::Level;
use crate::logger::Logger;

/// Maps `log` levels onto ours; `Trace` folds into `Debug`.
pub fn from_log_level(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug | log::Level::Trace => Level::Debug,
    }
}

/// Installs `logger` as the process-wide `log` backend and returns it.
///
/// The logger is leaked to get the `'static` lifetime `log` requires; its
/// level and sink can still be changed through the returned reference.
/// `log`'s own max level is opened fully so that level changes made later
/// through [`Logger::set_level`] take effect; filtering happens in the logger.
pub fn init(logger: Logger) -> Result<&'static Logger> {
    let logger: &'static Logger = Box::leak(Box::new(logger));
    log::set_logger(logger)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(logger)
}

struct MessageBuf {
    data: [u8; MAX_MESSAGE_LEN],
    len: usize,
}

impl MessageBuf {
    fn new() -> Self {
        Self {
            data: [0u8; MAX_MESSAGE_LEN],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        let bytes = &self.data[..self.len];
        match str::from_utf8(bytes) {
            Ok(s) => s,
            // Cut inside a multi-byte character.
            Err(e) => str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
        }
    }
}

impl Write for MessageBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.data.len() - self.len;
        let n = s.len().min(room);
        self.data[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        if n < s.len() {
            // Full; stop formatting.
            return Err(fmt::Error);
        }
        Ok(())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        Logger::enabled(self, from_log_level(metadata.level()))
    }

    fn log(&self, record: &log::Record<'_>) {
        let level = from_log_level(record.level());
        if !Logger::enabled(self, level) {
            return;
        }

        let mut message = MessageBuf::new();
        let _ = write!(message, "{}", record.args());
        Logger::log(self, level, message.as_str(), &[Field::str("target", record.target())]);
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(from_log_level(log::Level::Trace), Level::Debug);
        assert_eq!(from_log_level(log::Level::Warn), Level::Warn);
        assert_eq!(from_log_level(log::Level::Error), Level::Error);
    }

    #[test]
    fn test_message_truncated_on_char_boundary() {
        let mut message = MessageBuf::new();
        let long = format!("{}é", "a".repeat(MAX_MESSAGE_LEN - 1));
        let _ = write!(message, "{}", long);
        assert_eq!(message.as_str().len(), MAX_MESSAGE_LEN - 1);
    }
}
