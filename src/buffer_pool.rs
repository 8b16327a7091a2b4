//! Reusable encode buffers for field-bearing records.
//!
//! Field-bearing records do not fit the 256-byte stack buffer, so the logger
//! checks a larger buffer out of a shared pool instead. Buffers return to the
//! pool when the guard is dropped; in steady state no allocation happens. The
//! pool is bounded: when it is empty a fresh buffer is allocated, and when it
//! is full a returned buffer is simply freed.

use std::ops::{Deref, DerefMut};

use crossbeam_queue::ArrayQueue;
use lazy_static::lazy_static;

/// Size of one pooled encode buffer.
pub const FIELD_BUFFER_SIZE: usize = 1024;

/// Number of idle buffers the shared pool keeps.
const SHARED_POOL_CAPACITY: usize = 64;

type RawBuffer = Box<[u8; FIELD_BUFFER_SIZE]>;

lazy_static! {
    /// Pool shared by every logger in the process.
    pub static ref FIELD_BUFFERS: BufferPool = BufferPool::new(SHARED_POOL_CAPACITY);
}

pub struct BufferPool {
    free: ArrayQueue<RawBuffer>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Takes an idle buffer, allocating one if the pool is empty.
    ///
    /// A checked-out buffer belongs to the caller alone until the guard drops.
    #[inline]
    pub fn checkout(&self) -> PooledBuffer<'_> {
        let buffer = self
            .free
            .pop()
            .unwrap_or_else(|| Box::new([0u8; FIELD_BUFFER_SIZE]));
        PooledBuffer {
            buffer: Some(buffer),
            pool: self,
        }
    }

    /// Number of idle buffers currently held.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    fn release(&self, buffer: RawBuffer) {
        // A full pool drops the buffer.
        let _ = self.free.push(buffer);
    }
}

/// Buffer checked out of a [`BufferPool`]; returns itself on drop.
pub struct PooledBuffer<'a> {
    buffer: Option<RawBuffer>,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match &self.buffer {
            Some(buffer) => &buffer[..],
            None => &[],
        }
    }
}

impl DerefMut for PooledBuffer<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        match &mut self.buffer {
            Some(buffer) => &mut buffer[..],
            None => &mut [],
        }
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}
