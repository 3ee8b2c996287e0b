//! Link counters and per-frame events.

use packet_proto::Packet;

/// Outcome of one completed (or rejected) incoming frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// Data packet queued for the application and acknowledged.
    Received,
    /// Peer confirmed our last frame.
    Acknowledged,
    /// Peer asked for our last frame again. Use [`Link::resend_last`](crate::Link::resend_last).
    RetransmitRequested,
    /// CRC mismatch; a RETX went out.
    Corrupted,
    /// Length byte out of range; the assembler realigned.
    Desync,
    /// Valid data packet dropped because the queue was full.
    Dropped(Packet),
}

/// Running counters for one line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    pub frames_accepted: u32,
    pub frames_sent: u32,
    pub crc_errors: u32,
    pub desyncs: u32,
    pub acks_received: u32,
    pub retx_received: u32,
    pub dropped_queue_full: u32,
    pub send_errors: u32,
}

impl LinkStats {
    /// Frames that arrived but never reached the queue.
    #[must_use]
    pub fn frames_lost(&self) -> u32 {
        self.crc_errors
            .saturating_add(self.desyncs)
            .saturating_add(self.dropped_queue_full)
    }

    pub(crate) fn bump(counter: &mut u32) {
        *counter = counter.wrapping_add(1);
    }
}
