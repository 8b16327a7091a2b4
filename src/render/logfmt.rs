use std::io::{self, Write};

use parking_lot::Mutex;

use super::text;
use super::{append_time, Output};
use crate::codec;
use crate::config::Config;
use crate::error::Result;
use crate::field::Value;
use crate::sink::Sink;

const LOCAL_RFC3339: &str = "%Y-%m-%dT%H:%M:%S%:z";
const UTC_RFC3339: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Machine-readable renderer producing one logfmt line per record:
///
/// ```text
/// time=2024-01-02T15:04:05+01:00 level=info msg="service started" env=prod pid=123
/// ```
pub struct LogfmtRenderer<W: Write + Send> {
    output: Mutex<Output<W>>,
    utc: bool,
}

impl<W: Write + Send> LogfmtRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            output: Mutex::new(Output::new(out)),
            utc: false,
        }
    }

    pub fn from_config(config: &Config, out: W) -> Self {
        Self::new(out).with_utc(config.utc)
    }

    pub fn with_utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    pub fn write(&self, record: &[u8]) -> Result<()> {
        let mut output = self.output.lock();
        let Output { line, out } = &mut *output;
        line.clear();
        self.render_into(record, line)?;
        out.write_all(line)?;
        Ok(())
    }

    pub fn render_into(&self, record: &[u8], buf: &mut Vec<u8>) -> Result<()> {
        let record = codec::decode(record)?;

        buf.extend_from_slice(b"time=");
        let pattern = if self.utc { UTC_RFC3339 } else { LOCAL_RFC3339 };
        append_time(buf, record.timestamp, pattern, self.utc);

        buf.extend_from_slice(b" level=");
        let level = record.level().map_or("unknown", |l| l.as_str());
        buf.extend_from_slice(level.as_bytes());

        buf.extend_from_slice(b" msg=");
        text::append_logfmt(buf, record.message);

        for field in record.fields() {
            buf.push(b' ');
            match field {
                Ok(field) => {
                    buf.extend_from_slice(field.key);
                    buf.push(b'=');
                    append_value(buf, &field.value);
                }
                Err(bad) => {
                    buf.extend_from_slice(bad.key);
                    buf.extend_from_slice(b"=?");
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

impl LogfmtRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl LogfmtRenderer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> Sink for LogfmtRenderer<W> {
    #[inline]
    fn write(&self, record: &[u8]) -> Result<()> {
        LogfmtRenderer::write(self, record)
    }
}

fn append_value(buf: &mut Vec<u8>, value: &Value<'_>) {
    match *value {
        Value::Int(v) => text::append_i64(buf, v),
        Value::Uint(v) => text::append_u64(buf, v),
        // Shortest representation that round-trips.
        Value::Float32(v) => {
            let _ = write!(buf, "{}", v);
        }
        Value::Float64(v) => {
            let _ = write!(buf, "{}", v);
        }
        Value::Bool(v) => text::append_bool(buf, v),
        Value::Str(s) => text::append_logfmt(buf, s),
        Value::Bytes(b) => text::append_hex(buf, b),
    }
}
