//! Bounded queue of validated application packets.
//!
//! Only the polled context touches the queue, so plain indices suffice.
//! The queue reports full when the next write index would land on the read
//! index, which leaves one slot unused: a `PacketQueue<8>` stores 7 packets.
//! Arrivals at a full queue are refused, never overwritten.

use packet_proto::Packet;

use crate::error::ConfigError;

/// Fixed-capacity FIFO of packets.
#[derive(Debug, Clone)]
pub struct PacketQueue<const Q: usize> {
    slots: [Packet; Q],
    write: usize,
    read: usize,
}

impl<const Q: usize> PacketQueue<Q> {
    const MASK: usize = Q.wrapping_sub(1);

    const ASSERT_POWER_OF_TWO: () = assert!(
        Q.is_power_of_two(),
        "packet queue capacity must be a power of two"
    );

    /// Create an empty queue. A capacity that is not a power of two fails
    /// to compile.
    #[must_use]
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::ASSERT_POWER_OF_TWO;
        Self::empty()
    }

    /// Create an empty queue, checking the capacity at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CapacityNotPowerOfTwo`] if `Q` is zero or not
    /// a power of two.
    pub fn try_new() -> Result<Self, ConfigError> {
        if !Q.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo(Q));
        }
        Ok(Self::empty())
    }

    const fn empty() -> Self {
        Self {
            slots: [Packet::blank(0); Q],
            write: 0,
            read: 0,
        }
    }

    /// Store a packet. Returns `false` and drops it if the queue is full.
    pub fn enqueue(&mut self, packet: Packet) -> bool {
        let next = (self.write + 1) & Self::MASK;
        if next == self.read {
            return false;
        }

        self.slots[self.write] = packet;
        self.write = next;
        true
    }

    /// Take the oldest packet, or `None` if empty.
    pub fn dequeue(&mut self) -> Option<Packet> {
        if !self.is_available() {
            return None;
        }

        let packet = self.slots[self.read];
        self.read = (self.read + 1) & Self::MASK;
        Some(packet)
    }

    /// Look at the oldest packet without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&Packet> {
        self.is_available().then(|| &self.slots[self.read])
    }

    /// True if at least one packet is waiting.
    #[inline]
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.read != self.write
    }

    /// True if the next enqueue would be refused.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        ((self.write + 1) & Self::MASK) == self.read
    }

    /// Number of packets waiting.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.write.wrapping_sub(self.read) & Self::MASK
    }

    /// True if no packet is waiting.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.is_available()
    }

    /// Number of packets the queue can hold at once.
    #[inline]
    #[must_use]
    pub const fn usable_capacity(&self) -> usize {
        Q - 1
    }

    /// Drop every waiting packet.
    pub fn clear(&mut self) {
        self.read = self.write;
    }
}

impl<const Q: usize> Default for PacketQueue<Q> {
    fn default() -> Self {
        Self::new()
    }
}
