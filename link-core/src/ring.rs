//! Single-producer/single-consumer byte ring buffer.
//!
//! The interrupt handler is the only writer and the polled link is the only
//! reader. [`RingBuffer::split`] hands out exactly one [`Producer`] and one
//! [`Consumer`], so the discipline is enforced by the borrow checker rather
//! than by convention.
//!
//! Cursors run freely and are masked with `N - 1` when indexing, so the
//! buffer holds all `N` bytes and full/empty fall out of the cursor distance.
//! Each cursor has exactly one writer. The producer stores the data byte
//! before publishing the write cursor with `Release`, and the consumer loads
//! that cursor with `Acquire` before reading the byte.
//!
//! # Example
//!
//! ```
//! use link_core::RingBuffer;
//!
//! let mut ring = RingBuffer::<8>::new();
//! let (mut producer, mut consumer) = ring.split();
//!
//! assert!(producer.write(0x42));
//! assert_eq!(consumer.read(), Some(0x42));
//! assert_eq!(consumer.read(), None);
//! ```

use core::sync::atomic::Ordering;
use portable_atomic::{AtomicU8, AtomicUsize};

use crate::error::ConfigError;

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: AtomicU8 = AtomicU8::new(0);

/// Fixed-capacity byte ring shared between one writer and one reader.
pub struct RingBuffer<const N: usize> {
    slots: [AtomicU8; N],
    write: AtomicUsize,
    read: AtomicUsize,
}

impl<const N: usize> RingBuffer<N> {
    const MASK: usize = N.wrapping_sub(1);

    const ASSERT_POWER_OF_TWO: () = assert!(
        N.is_power_of_two(),
        "ring buffer capacity must be a power of two"
    );

    /// Create an empty ring buffer.
    ///
    /// Usable in `static` initializers. A capacity that is not a power of
    /// two fails to compile.
    #[must_use]
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::ASSERT_POWER_OF_TWO;
        Self::empty()
    }

    /// Create an empty ring buffer, checking the capacity at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CapacityNotPowerOfTwo`] if `N` is zero or not
    /// a power of two.
    pub fn try_new() -> Result<Self, ConfigError> {
        if !N.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo(N));
        }
        Ok(Self::empty())
    }

    const fn empty() -> Self {
        Self {
            slots: [EMPTY_SLOT; N],
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    /// Total number of bytes the buffer can hold.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes waiting to be read.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// True if no byte is waiting.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the next write would be dropped.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Append a byte. Returns `false` and drops the byte if the buffer is full.
    ///
    /// For single-context use; across contexts go through [`Producer`].
    #[inline]
    pub fn write(&mut self, byte: u8) -> bool {
        self.push(byte)
    }

    /// Take the oldest byte, or `None` if empty.
    ///
    /// For single-context use; across contexts go through [`Consumer`].
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        self.pop()
    }

    /// Split into the interrupt-side writer and the polled-side reader.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let ring: &RingBuffer<N> = self;
        (Producer { ring }, Consumer { ring })
    }

    fn push(&self, byte: u8) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);
        if write.wrapping_sub(read) == N {
            return false;
        }

        self.slots[write & Self::MASK].store(byte, Ordering::Relaxed);
        self.write.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    fn pop(&self) -> Option<u8> {
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);
        if write == read {
            return None;
        }

        let byte = self.slots[read & Self::MASK].load(Ordering::Relaxed);
        self.read.store(read.wrapping_add(1), Ordering::Release);
        Some(byte)
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write half of a [`RingBuffer`]. Owned by the interrupt context.
pub struct Producer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Append a byte. Returns `false` and drops the byte if the buffer is full.
    #[inline]
    pub fn write(&mut self, byte: u8) -> bool {
        self.ring.push(byte)
    }

    /// True if the next write would be dropped.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }
}

/// Read half of a [`RingBuffer`]. Owned by the polled link.
pub struct Consumer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Take the oldest byte, or `None` if empty.
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        self.ring.pop()
    }

    /// True if no byte is waiting.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of bytes waiting to be read.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Capacity of the underlying buffer.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }
}
