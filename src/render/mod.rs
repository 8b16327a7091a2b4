//! Sinks that decode records back into text.
//!
//! Both renderers validate the header, then render whatever part of the field
//! section is readable. A damaged field shows up as `key=?` and ends the line;
//! only a short or foreign header makes the whole record fail.

pub mod logfmt;
pub mod terminal;
pub mod text;

use std::fmt::{self, Write as _};
use std::io::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

pub use logfmt::LogfmtRenderer;
pub use terminal::TerminalRenderer;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Reusable line buffer and the destination it is flushed to. Renderers keep
/// one behind a mutex so concurrent callers never share a half-built line.
struct Output<W> {
    line: Vec<u8>,
    out: W,
}

impl<W: Write> Output<W> {
    fn new(out: W) -> Self {
        Self {
            line: Vec::with_capacity(512),
            out,
        }
    }
}

/// Whether chrono accepts every specifier in `pattern`.
pub(crate) fn is_valid_time_format(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// `fmt::Write` over a byte buffer, so a failing `Display` impl surfaces as
/// an error instead of a panic in `io::Write::write_fmt`.
struct ByteWriter<'a>(&'a mut Vec<u8>);

impl fmt::Write for ByteWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// Appends `nanos` since the epoch formatted with a chrono pattern. Falls back
/// to the raw nanosecond count when the time cannot be formatted.
fn append_time(buf: &mut Vec<u8>, nanos: u64, pattern: &str, utc: bool) {
    let secs = (nanos / NANOS_PER_SEC) as i64;
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    let Some(time) = DateTime::from_timestamp(secs, subsec) else {
        text::append_u64(buf, nanos);
        return;
    };

    let start = buf.len();
    let result = if utc {
        write!(ByteWriter(buf), "{}", time.format(pattern))
    } else {
        write!(ByteWriter(buf), "{}", time.with_timezone(&Local).format(pattern))
    };
    if result.is_err() {
        buf.truncate(start);
        text::append_u64(buf, nanos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_format_validation() {
        assert!(is_valid_time_format("%m-%d|%H:%M:%S"));
        assert!(is_valid_time_format("%Y-%m-%dT%H:%M:%S%.3f"));
        assert!(!is_valid_time_format("%Q"));
        assert!(!is_valid_time_format("%H:%"));
    }

    #[test]
    fn test_append_time_utc() {
        let mut buf = Vec::new();
        append_time(&mut buf, 86_400 * NANOS_PER_SEC, "%Y-%m-%d", true);
        assert_eq!(buf, b"1970-01-02");
    }
}
