//! Lock-free single-producer, multi-consumer ring of fixed-size byte slots.
//!
//! The ring holds `N` slots (a power of two) and two cursors: `head`, owned by
//! the producer, and `tail`, which consumers advance with compare-and-swap. One
//! slot always stays empty so that `head == tail` means empty and
//! `head - tail == N - 1` means full; the usable capacity is `N - 1`.
//!
//! Cursors are free-running 64-bit counters, masked down to a slot index on
//! access, so a consumer holding a stale `tail` can never win a CAS against a
//! cursor that has since wrapped around to the same index.
//!
//! Each slot owns a private copy of its record and a state flag:
//!
//! ```text
//! EMPTY --put--> READY --claimed consumer copies out--> EMPTY
//! ```
//!
//! The producer only writes a slot in the `EMPTY` state and publishes it with a
//! release store before advancing `head`; a consumer only reads a slot after
//! winning the CAS on `tail` and observing `READY` with acquire ordering. No two
//! threads ever touch a slot's bytes at the same time.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::error::{Error, Result};

/// Bytes of record data one slot holds; longer records are truncated.
pub const SLOT_SIZE: usize = 256;

const EMPTY: u8 = 0;
const READY: u8 = 1;

/// A record copied out of the ring.
#[derive(Clone)]
pub struct Entry {
    data: [u8; SLOT_SIZE],
    len: usize,
}

impl Entry {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry").field("len", &self.len).finish()
    }
}

struct Slot {
    state: AtomicU8,
    len: UnsafeCell<usize>,
    data: UnsafeCell<[u8; SLOT_SIZE]>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            len: UnsafeCell::new(0),
            data: UnsafeCell::new([0u8; SLOT_SIZE]),
        }
    }
}

pub struct RingBuffer {
    slots: Box<[Slot]>,
    mask: u64,
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
    // Serializes callers of `put` so the ring stays single-producer even when
    // the owning writer is shared between threads.
    producing: CachePadded<AtomicBool>,
}

// SAFETY: slot contents are only accessed under the protocol described in the
// module docs. The producer side is serialized by `producing`; a slot's bytes
// are written by the producer only while the slot is EMPTY and read by the
// single consumer that won the CAS on `tail` while the slot is READY.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Creates a ring with `size` slots, holding at most `size - 1` records.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCapacity`] if `size` is not a power of two or is below 2.
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(Error::InvalidCapacity(size));
        }

        let slots: Vec<Slot> = (0..size).map(|_| Slot::new()).collect();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            mask: (size - 1) as u64,
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            producing: CachePadded::new(AtomicBool::new(false)),
        })
    }

    /// Number of slots, `N`.
    #[inline]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of records held at once, `N - 1`.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Approximate number of queued records.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.saturating_sub(tail) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `bytes` into the next free slot.
    ///
    /// Returns `false` without blocking or overwriting when the ring is full.
    /// Records longer than [`SLOT_SIZE`] are truncated.
    pub fn put(&self, bytes: &[u8]) -> bool {
        let backoff = Backoff::new();
        while self
            .producing
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.snooze();
        }

        let stored = self.put_exclusive(bytes);
        self.producing.store(false, Ordering::Release);
        stored
    }

    fn put_exclusive(&self, bytes: &[u8]) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head - tail >= self.mask {
            return false;
        }

        let slot = &self.slots[(head & self.mask) as usize];
        // A consumer may have claimed this slot a lap ago and still be copying
        // it out; treat that the same as a full ring.
        if slot.state.load(Ordering::Acquire) != EMPTY {
            return false;
        }

        let len = bytes.len().min(SLOT_SIZE);
        // SAFETY: we are the only producer and the slot is EMPTY, so no
        // consumer reads it until the READY store below.
        unsafe {
            (&mut *slot.data.get())[..len].copy_from_slice(&bytes[..len]);
            *slot.len.get() = len;
        }
        slot.state.store(READY, Ordering::Release);
        self.head.store(head + 1, Ordering::Release);
        true
    }

    /// Takes the oldest record, or `None` if the ring is empty.
    ///
    /// Safe to call from any number of threads at once.
    pub fn get(&self) -> Option<Entry> {
        let backoff = Backoff::new();
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let head = self.head.load(Ordering::Acquire);
            if tail >= head {
                return None;
            }

            if self
                .tail
                .compare_exchange_weak(tail, tail + 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
            {
                // Another consumer took this slot.
                backoff.spin();
                continue;
            }

            let slot = &self.slots[(tail & self.mask) as usize];
            let wait = Backoff::new();
            while slot.state.load(Ordering::Acquire) != READY {
                wait.snooze();
            }

            let mut entry = Entry {
                data: [0u8; SLOT_SIZE],
                len: 0,
            };
            // SAFETY: winning the CAS makes us the only reader of this slot and
            // the producer does not touch it again until it is EMPTY.
            unsafe {
                let len = *slot.len.get();
                entry.data[..len].copy_from_slice(&(&*slot.data.get())[..len]);
                entry.len = len;
            }
            slot.state.store(EMPTY, Ordering::Release);
            return Some(entry);
        }
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("size", &self.size())
            .field("len", &self.len())
            .finish()
    }
}
