use std::io::{self, IsTerminal, Write};

use parking_lot::Mutex;
use tracing::warn;

use super::text;
use super::{append_time, is_valid_time_format, Output};
use crate::codec;
use crate::config::{Config, DEFAULT_TIME_FORMAT};
use crate::error::Result;
use crate::field::Value;
use crate::level::Level;
use crate::sink::Sink;

/// Width the message is padded to when fields follow it.
pub const MESSAGE_COLUMN: usize = 40;

const RESET: &[u8] = b"\x1b[0m";

fn level_token(level: Option<Level>) -> &'static [u8] {
    match level {
        Some(Level::Debug) => b"DEBUG",
        Some(Level::Info) => b"INFO ",
        Some(Level::Warn) => b"WARN ",
        Some(Level::Error) => b"ERROR",
        Some(Level::Fatal) => b"FATAL",
        None => b"UNKN ",
    }
}

fn level_color(level: Level) -> &'static [u8] {
    match level {
        Level::Debug => b"\x1b[36m",
        Level::Info => b"\x1b[32m",
        Level::Warn => b"\x1b[33m",
        Level::Error => b"\x1b[31m",
        Level::Fatal => b"\x1b[35m",
    }
}

/// Human-oriented renderer: one aligned, optionally colored line per record.
///
/// ```text
/// INFO [01-02|15:04:05] service started                         env=prod pid=123
/// ```
///
/// Level token and keys are colored by level when color is on. Strings are
/// escaped with [`text::escape`], blobs are hex, floats have three decimals.
pub struct TerminalRenderer<W: Write + Send> {
    output: Mutex<Output<W>>,
    color: bool,
    time_format: String,
    utc: bool,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            output: Mutex::new(Output::new(out)),
            color,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            utc: false,
        }
    }

    /// Applies the configured time settings. `ColorMode::Auto` means no color
    /// here since an arbitrary writer cannot be probed for a terminal.
    pub fn from_config(config: &Config, out: W) -> Self {
        Self::new(out, config.color.enabled(false))
            .with_time_format(config.time_format.clone())
            .with_utc(config.utc)
    }

    /// Sets the chrono pattern used for the bracketed timestamp. A pattern
    /// chrono rejects is replaced by [`DEFAULT_TIME_FORMAT`].
    pub fn with_time_format(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        if is_valid_time_format(&pattern) {
            self.time_format = pattern;
        } else {
            warn!(pattern = %pattern, "invalid time format, using default");
            self.time_format = DEFAULT_TIME_FORMAT.to_string();
        }
        self
    }

    pub fn time_format(&self) -> &str {
        &self.time_format
    }

    pub fn with_utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Renders `record` and writes the line to the destination.
    pub fn write(&self, record: &[u8]) -> Result<()> {
        let mut output = self.output.lock();
        let Output { line, out } = &mut *output;
        line.clear();
        self.render_into(record, line)?;
        out.write_all(line)?;
        Ok(())
    }

    /// Appends the rendered line for `record`, newline included, to `buf`.
    pub fn render_into(&self, record: &[u8], buf: &mut Vec<u8>) -> Result<()> {
        let record = codec::decode(record)?;
        let level = record.level();
        let color = if self.color { level.map(level_color) } else { None };

        paint(buf, color, level_token(level));
        buf.push(b'[');
        append_time(buf, record.timestamp, &self.time_format, self.utc);
        buf.extend_from_slice(b"] ");
        buf.extend_from_slice(record.message);

        if record.has_fields() {
            let pad = MESSAGE_COLUMN.saturating_sub(record.message.len()).max(1);
            buf.resize(buf.len() + pad, b' ');

            for (i, field) in record.fields().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                match field {
                    Ok(field) => {
                        paint(buf, color, field.key);
                        buf.push(b'=');
                        append_value(buf, &field.value);
                    }
                    Err(bad) => {
                        paint(buf, color, bad.key);
                        buf.extend_from_slice(b"=?");
                    }
                }
            }
        }

        buf.push(b'\n');
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.output.into_inner().out
    }
}

impl TerminalRenderer<io::Stdout> {
    /// Renderer on stdout, colored when stdout is a terminal.
    pub fn stdout() -> Self {
        Self::stdout_with(&Config::default())
    }

    pub fn stdout_with(config: &Config) -> Self {
        let out = io::stdout();
        let color = config.color.enabled(out.is_terminal());
        Self::from_config(config, out).with_color(color)
    }
}

impl TerminalRenderer<io::Stderr> {
    /// Renderer on stderr, colored when stderr is a terminal.
    pub fn stderr() -> Self {
        Self::stderr_with(&Config::default())
    }

    pub fn stderr_with(config: &Config) -> Self {
        let out = io::stderr();
        let color = config.color.enabled(out.is_terminal());
        Self::from_config(config, out).with_color(color)
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

impl<W: Write + Send> Sink for TerminalRenderer<W> {
    #[inline]
    fn write(&self, record: &[u8]) -> Result<()> {
        TerminalRenderer::write(self, record)
    }
}

fn paint(buf: &mut Vec<u8>, color: Option<&[u8]>, token: &[u8]) {
    match color {
        Some(code) => {
            buf.extend_from_slice(code);
            buf.extend_from_slice(token);
            buf.extend_from_slice(RESET);
        }
        None => buf.extend_from_slice(token),
    }
}

fn append_value(buf: &mut Vec<u8>, value: &Value<'_>) {
    match *value {
        Value::Int(v) => text::append_i64(buf, v),
        Value::Uint(v) => text::append_u64(buf, v),
        Value::Float32(v) => text::append_fixed3(buf, v as f64),
        Value::Float64(v) => text::append_fixed3(buf, v),
        Value::Bool(v) => text::append_bool(buf, v),
        Value::Str(s) => text::append_escaped(buf, s),
        Value::Bytes(b) => text::append_hex(buf, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn encode(level: Level, message: &[u8], fields: &[Field<'_>]) -> Vec<u8> {
        let mut buf = vec![0u8; 1024];
        let n = codec::encode(&mut buf, level, 1, 0, message, fields);
        buf.truncate(n);
        buf
    }

    fn render(renderer: &TerminalRenderer<Vec<u8>>, record: &[u8]) -> String {
        let mut line = Vec::new();
        renderer.render_into(record, &mut line).unwrap();
        String::from_utf8(line).unwrap()
    }

    #[test]
    fn test_message_only_line_has_no_padding() {
        let renderer = TerminalRenderer::new(Vec::new(), false).with_utc(true);
        let line = render(&renderer, &encode(Level::Warn, b"low disk", &[]));
        assert_eq!(line, "WARN [01-01|00:00:00] low disk\n");
    }

    #[test]
    fn test_long_message_gets_single_space() {
        let renderer = TerminalRenderer::new(Vec::new(), false).with_utc(true);
        let message = [b'x'; 45];
        let line = render(&renderer, &encode(Level::Info, &message, &[Field::bool("ok", true)]));
        assert!(line.ends_with(&format!("{} ok=true\n", "x".repeat(45))));
    }

    #[test]
    fn test_colored_level_and_keys() {
        let renderer = TerminalRenderer::new(Vec::new(), true).with_utc(true);
        let line = render(&renderer, &encode(Level::Error, b"boom", &[Field::int("code", -7)]));
        assert!(line.starts_with("\x1b[31mERROR\x1b[0m["));
        assert!(line.ends_with("\x1b[31mcode\x1b[0m=-7\n"));
    }

    #[test]
    fn test_unknown_level_token() {
        let renderer = TerminalRenderer::new(Vec::new(), true).with_utc(true);
        let mut record = encode(Level::Info, b"odd", &[]);
        record[5] = 9;
        let line = render(&renderer, &record);
        // No color for a level we cannot name.
        assert_eq!(line, "UNKN [01-01|00:00:00] odd\n");
    }
}
