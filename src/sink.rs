use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Destination for encoded records.
///
/// A sink receives one complete wire-format record per call. The slice is only
/// valid for the duration of the call: the logger reuses the underlying buffer
/// as soon as `write` returns, so implementations must copy anything they keep.
///
/// Sinks are shared between every thread that logs through the same logger and
/// therefore must be `Send + Sync`.
///
/// # Usage
///
/// ```
/// # use ultralog::{Logger, Level, Field};
/// # use std::sync::atomic::{AtomicUsize, Ordering};
/// # use std::sync::Arc;
/// let bytes = Arc::new(AtomicUsize::new(0));
/// let counter = bytes.clone();
///
/// let logger = Logger::new();
/// logger.set_sink(ultralog::sink::from_fn(move |record| {
///     counter.fetch_add(record.len(), Ordering::Relaxed);
///     Ok(())
/// }));
/// logger.info("service started", &[Field::str("env", "prod")]);
/// assert!(bytes.load(Ordering::Relaxed) > 0);
/// ```
pub trait Sink: Send + Sync {
    fn write(&self, record: &[u8]) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    #[inline]
    fn write(&self, record: &[u8]) -> Result<()> {
        (**self).write(record)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    #[inline]
    fn write(&self, record: &[u8]) -> Result<()> {
        (**self).write(record)
    }
}

/// Sink backed by a closure; see [`from_fn`].
#[derive(Clone)]
pub struct FnSink<F>(F);

/// Wraps a closure as a [`Sink`].
pub fn from_fn<F>(f: F) -> FnSink<F>
where
    F: Fn(&[u8]) -> Result<()> + Send + Sync,
{
    FnSink(f)
}

impl<F> Sink for FnSink<F>
where
    F: Fn(&[u8]) -> Result<()> + Send + Sync,
{
    #[inline]
    fn write(&self, record: &[u8]) -> Result<()> {
        (self.0)(record)
    }
}

/// Drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Sink for Discard {
    #[inline]
    fn write(&self, _record: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Writes raw encoded records to any `io::Write`, e.g. a file to be decoded
/// later with [`RecordReader`](crate::RecordReader).
pub struct IoSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> IoSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn flush(&self) -> io::Result<()> {
        self.out.lock().flush()
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> Sink for IoSink<W> {
    fn write(&self, record: &[u8]) -> Result<()> {
        self.out.lock().write_all(record)?;
        Ok(())
    }
}
