//! Splitting arbitrary payloads into independent packets.
//!
//! Each fragment is a complete, sealed [`Packet`] carrying at most
//! [`MAX_PAYLOAD_SIZE`] bytes. There is no sequence number or reassembly
//! header; the receiver recovers the payload by concatenating fragments in
//! arrival order.
//!
//! # Example
//!
//! ```
//! use packet_proto::{fragment, MAX_PAYLOAD_SIZE};
//!
//! let payload = [0x55u8; 30];
//! let packets: Vec<_> = fragment(&payload).collect();
//!
//! assert_eq!(packets.len(), 3);
//! assert_eq!(packets[0].payload().len(), MAX_PAYLOAD_SIZE);
//! assert_eq!(packets[2].payload().len(), 2);
//! ```

use crate::packet::{Packet, MAX_PAYLOAD_SIZE};

/// Iterator over the packets for one payload.
///
/// An empty payload yields a single zero-length packet.
#[derive(Debug, Clone)]
pub struct Fragments<'a> {
    remaining: &'a [u8],
    emitted_any: bool,
}

impl<'a> Fragments<'a> {
    /// Start fragmenting `payload`.
    #[must_use]
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            remaining: payload,
            emitted_any: false,
        }
    }

    /// Bytes not yet packed into a fragment.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        self.remaining
    }
}

impl Iterator for Fragments<'_> {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        if self.remaining.is_empty() && self.emitted_any {
            return None;
        }

        let take = self.remaining.len().min(MAX_PAYLOAD_SIZE);
        let (chunk, rest) = self.remaining.split_at(take);
        self.remaining = rest;
        self.emitted_any = true;

        // chunk is bounded by MAX_PAYLOAD_SIZE, so construction cannot fail
        Packet::new(chunk).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.remaining.is_empty() {
            usize::from(!self.emitted_any)
        } else {
            self.remaining.len().div_ceil(MAX_PAYLOAD_SIZE)
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for Fragments<'_> {}

/// Fragment `payload` into sealed packets.
#[inline]
#[must_use]
pub fn fragment(payload: &[u8]) -> Fragments<'_> {
    Fragments::new(payload)
}

/// Number of packets needed to carry `len` payload bytes.
#[inline]
#[must_use]
pub const fn frame_count(len: usize) -> usize {
    if len == 0 {
        1
    } else {
        len.div_ceil(MAX_PAYLOAD_SIZE)
    }
}
