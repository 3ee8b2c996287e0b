//! Byte-at-a-time packet assembler.
//!
//! The assembler rebuilds one [`Packet`] from the incoming byte stream. It
//! keeps its phase between calls, so bytes may arrive in any burst size and
//! the caller simply feeds whatever the ring buffer currently holds.
//!
//! ```text
//!             length ≤ 14              count == length
//! AwaitingLength ──────────► AwaitingData ───────────────► AwaitingCrc
//!      ▲  │ length > 14 (desync)                               │
//!      │  └──────────────┐                                     │ crc byte
//!      └─────────────────┴─────────────────────────────────────┘
//! ```
//!
//! Every frame starts from an all-fill packet so that the CRC and sentinel
//! comparisons see the same fill bytes the sender used.

use packet_proto::{Packet, MAX_PAYLOAD_SIZE};

/// Where the assembler is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Next byte is the length of a new frame.
    AwaitingLength,
    /// Collecting declared data bytes.
    AwaitingData,
    /// Next byte is the frame's CRC.
    AwaitingCrc,
}

/// Result of a frame that has finished, successfully or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Assembled {
    /// CRC checked; the packet may be data or a control sentinel.
    Valid(Packet),
    /// CRC mismatch. The packet is discarded.
    Corrupt {
        /// CRC computed over the reassembled region.
        expected: u8,
        /// CRC byte that arrived on the wire.
        received: u8,
    },
    /// Length byte can not describe a frame; alignment with the sender is lost.
    Desync {
        /// Offending length byte.
        length: u8,
    },
}

/// Resumable frame assembly state for one line.
#[derive(Debug, Clone)]
pub struct Assembler {
    phase: Phase,
    packet: Packet,
    received: u8,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    /// Create an assembler waiting for a length byte.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::AwaitingLength,
            packet: Packet::blank(0),
            received: 0,
        }
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Data bytes received so far in the current frame.
    #[inline]
    #[must_use]
    pub fn data_received(&self) -> u8 {
        self.received
    }

    /// Abandon any partial frame and wait for a new length byte.
    pub fn reset(&mut self) {
        self.phase = Phase::AwaitingLength;
        self.packet = Packet::blank(0);
        self.received = 0;
    }

    /// Feed one byte.
    ///
    /// Returns `Some` when the byte finished a frame (or proved it broken);
    /// the assembler is then back in [`Phase::AwaitingLength`].
    pub fn push_byte(&mut self, byte: u8) -> Option<Assembled> {
        match self.phase {
            Phase::AwaitingLength => {
                if byte as usize > MAX_PAYLOAD_SIZE {
                    self.reset();
                    return Some(Assembled::Desync { length: byte });
                }

                self.packet = Packet::blank(byte);
                self.received = 0;
                self.phase = if byte == 0 {
                    Phase::AwaitingCrc
                } else {
                    Phase::AwaitingData
                };
                None
            }
            Phase::AwaitingData => {
                self.packet.data[self.received as usize] = byte;
                self.received += 1;
                if self.received >= self.packet.length {
                    self.phase = Phase::AwaitingCrc;
                }
                None
            }
            Phase::AwaitingCrc => {
                self.packet.crc = byte;
                let expected = self.packet.compute_crc();
                let result = if expected == byte {
                    Assembled::Valid(self.packet)
                } else {
                    Assembled::Corrupt {
                        expected,
                        received: byte,
                    }
                };
                self.reset();
                Some(result)
            }
        }
    }

    /// Feed bytes from `next` until a frame finishes or `next` runs dry.
    ///
    /// Bytes after a finished frame are left in the source.
    pub fn pull<F>(&mut self, mut next: F) -> Option<Assembled>
    where
        F: FnMut() -> Option<u8>,
    {
        while let Some(byte) = next() {
            if let Some(done) = self.push_byte(byte) {
                return Some(done);
            }
        }
        None
    }
}
