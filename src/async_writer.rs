use std::sync::atomic::{self, AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_utils::Backoff;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::Result;
use crate::ring_buffer::{RingBuffer, SLOT_SIZE};
use crate::sink::Sink;

/// Upper bound on how long an idle consumer sleeps before polling the ring
/// again, covering a wake-up that raced with going to sleep.
const IDLE_PARK_TIMEOUT: Duration = Duration::from_millis(1);

/// Sink that hands records to a background thread through a [`RingBuffer`].
///
/// `write` copies the record into the ring and returns at once. When the ring
/// is full, the record is written synchronously to the downstream sink on the
/// caller's thread instead: memory stays bounded and nothing is dropped, at
/// the cost of latency under sustained overload. Records larger than a ring
/// slot also take the synchronous path rather than being truncated.
///
/// Records that go through the ring reach the downstream sink in FIFO order.
/// A record that falls back to the synchronous path can overtake records still
/// queued in the ring.
///
/// The consumer thread spins, then yields, then parks on a condition variable
/// while the ring stays empty, so an idle writer does not keep a core busy.
///
/// Clones share one ring and one consumer. The consumer is stopped and the ring
/// drained by [`AsyncWriter::close`], or when the last clone is dropped.
///
/// # Examples
///
/// ```
/// # use ultralog::{AsyncWriter, Discard, Logger};
/// let writer = AsyncWriter::new(Discard, 1024).unwrap();
/// let logger = Logger::with_sink(writer.clone());
/// logger.info("queued", &[]);
/// writer.close();
/// ```
pub struct AsyncWriter<S: Sink + 'static> {
    inner: Arc<Inner<S>>,
}

struct Inner<S: Sink + 'static> {
    shared: Arc<Shared<S>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Shared<S> {
    ring: RingBuffer,
    downstream: S,
    closed: AtomicBool,
    sleeping: AtomicBool,
    idle: Mutex<()>,
    wakeup: Condvar,
}

impl<S: Sink + 'static> AsyncWriter<S> {
    /// Starts the consumer thread. `ring_size` must be a power of two.
    pub fn new(downstream: S, ring_size: usize) -> Result<Self> {
        let shared = Arc::new(Shared {
            ring: RingBuffer::new(ring_size)?,
            downstream,
            closed: AtomicBool::new(false),
            sleeping: AtomicBool::new(false),
            idle: Mutex::new(()),
            wakeup: Condvar::new(),
        });

        let consumer = shared.clone();
        let handle = thread::Builder::new()
            .name("ultralog-async".into())
            .spawn(move || consumer.run())?;

        debug!(ring_size, "async writer started");
        Ok(Self {
            inner: Arc::new(Inner {
                shared,
                worker: Mutex::new(Some(handle)),
            }),
        })
    }

    pub fn from_config(config: &Config, downstream: S) -> Result<Self> {
        Self::new(downstream, config.ring_capacity)
    }

    /// Records waiting in the ring.
    pub fn pending(&self) -> usize {
        self.inner.shared.ring.len()
    }

    pub fn downstream(&self) -> &S {
        &self.inner.shared.downstream
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shared.closed.load(Ordering::SeqCst)
    }

    pub fn write(&self, record: &[u8]) -> Result<()> {
        let shared = &*self.inner.shared;
        if record.len() > SLOT_SIZE || shared.closed.load(Ordering::SeqCst) {
            return shared.downstream.write(record);
        }

        if !shared.ring.put(record) {
            trace!(len = record.len(), "ring full, writing synchronously");
            return shared.downstream.write(record);
        }

        // Pairs with the fences in `close` and `park`: either they see the new
        // head, or we see their flag.
        atomic::fence(Ordering::SeqCst);
        if shared.closed.load(Ordering::SeqCst) {
            // Closed while we were enqueuing; the consumer may already be gone.
            shared.drain();
        } else if shared.sleeping.load(Ordering::SeqCst) {
            let _guard = shared.idle.lock();
            shared.wakeup.notify_one();
        }
        Ok(())
    }

    /// Stops the consumer after every queued record has been delivered.
    ///
    /// Returns once the ring is drained, also when another thread is closing
    /// the writer at the same time. Later writes go straight to the downstream
    /// sink. Calling `close` again is a no-op.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl<S: Sink + 'static> Clone for AsyncWriter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Sink + 'static> Sink for AsyncWriter<S> {
    #[inline]
    fn write(&self, record: &[u8]) -> Result<()> {
        AsyncWriter::write(self, record)
    }
}

impl<S: Sink + 'static> Inner<S> {
    fn close(&self) {
        // Held for the whole shutdown so a concurrent caller returns only after
        // the first one has joined the consumer and drained the ring.
        let mut worker = self.worker.lock();
        let shared = &*self.shared;
        if shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        atomic::fence(Ordering::SeqCst);

        {
            let _guard = shared.idle.lock();
            shared.wakeup.notify_all();
        }

        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                warn!("async writer consumer panicked");
            }
        }

        shared.drain();
        debug!("async writer closed");
    }
}

impl<S: Sink + 'static> Drop for Inner<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: Sink> Shared<S> {
    fn run(&self) {
        let backoff = Backoff::new();
        loop {
            if let Some(entry) = self.ring.get() {
                self.forward(entry.as_bytes());
                backoff.reset();
                continue;
            }

            if self.closed.load(Ordering::SeqCst) {
                self.drain();
                return;
            }

            if backoff.is_completed() {
                self.park();
                backoff.reset();
            } else {
                backoff.snooze();
            }
        }
    }

    fn park(&self) {
        let mut guard = self.idle.lock();
        self.sleeping.store(true, Ordering::SeqCst);
        atomic::fence(Ordering::SeqCst);
        if self.ring.is_empty() && !self.closed.load(Ordering::SeqCst) {
            self.wakeup.wait_for(&mut guard, IDLE_PARK_TIMEOUT);
        }
        self.sleeping.store(false, Ordering::SeqCst);
    }

    fn drain(&self) {
        while let Some(entry) = self.ring.get() {
            self.forward(entry.as_bytes());
        }
    }

    fn forward(&self, record: &[u8]) {
        if let Err(err) = self.downstream.write(record) {
            warn!(error = %err, "downstream sink rejected queued record");
        }
    }
}
