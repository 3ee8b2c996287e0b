//! Per-line reliability layer.
//!
//! A [`Link`] owns everything one UART line needs on the polled side: the
//! read half of the receive ring, the frame assembler, the queue of received
//! packets, the outgoing byte sink and the last transmitted frame.
//!
//! Incoming frames are answered as they complete:
//!
//! | Frame                | Reply | Queue        | Event                   |
//! |----------------------|-------|--------------|-------------------------|
//! | data, queue has room | ACK   | enqueued     | `Received`              |
//! | data, queue full     | none  | dropped      | `Dropped`               |
//! | ACK sentinel         | none  | untouched    | `Acknowledged`          |
//! | RETX sentinel        | RETX  | untouched    | `RetransmitRequested`   |
//! | CRC mismatch         | RETX  | untouched    | `Corrupted`             |
//! | length byte > 14     | none  | untouched    | `Desync`                |
//!
//! Control replies never replace the last transmitted frame, so
//! [`Link::resend_last`] always repeats application data.

use packet_proto::{fragment, Packet, PacketKind, MAX_FRAME_SIZE};

use crate::assembler::{Assembled, Assembler};
use crate::config::{LineId, LinkConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_RING_CAPACITY};
use crate::error::{ConfigError, LinkError};
use crate::queue::PacketQueue;
use crate::ring::Consumer;
use crate::sink::ByteSink;
use crate::stats::{LinkEvent, LinkStats};

/// Reliable packet link on one UART line.
///
/// `N` is the capacity of the receive ring the consumer came from and `Q`
/// the packet queue capacity (holding `Q - 1` packets).
pub struct Link<
    'a,
    S,
    const N: usize = DEFAULT_RING_CAPACITY,
    const Q: usize = DEFAULT_QUEUE_CAPACITY,
> {
    config: LinkConfig,
    rx: Consumer<'a, N>,
    sink: S,
    assembler: Assembler,
    queue: PacketQueue<Q>,
    last_transmitted: Option<Packet>,
    stats: LinkStats,
}

impl<'a, S: ByteSink, const N: usize, const Q: usize> Link<'a, S, N, Q> {
    /// Bring up a link.
    ///
    /// # Errors
    ///
    /// Returns the first problem [`LinkConfig::validate`] finds, or
    /// [`ConfigError::CapacityNotPowerOfTwo`] if `Q` is unusable.
    pub fn new(config: LinkConfig, rx: Consumer<'a, N>, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let queue = PacketQueue::try_new()?;

        info!(
            "line {}: link up, {} baud, packets={}",
            config.line.index(),
            config.baudrate,
            config.use_packets
        );

        Ok(Self {
            config,
            rx,
            sink,
            assembler: Assembler::new(),
            queue,
            last_transmitted: None,
            stats: LinkStats::default(),
        })
    }

    /// Settings this link was created with.
    #[inline]
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Line this link runs on.
    #[inline]
    pub fn line(&self) -> LineId {
        self.config.line
    }

    /// Counters since creation.
    #[inline]
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Tear down, returning the ring consumer and the sink.
    pub fn into_parts(self) -> (Consumer<'a, N>, S) {
        (self.rx, self.sink)
    }

    // ---- receive ----

    /// Advance the assembler with buffered bytes until one frame completes.
    ///
    /// Returns `None` once the ring is drained without finishing a frame; the
    /// partial frame is kept for the next call. In raw mode no bytes are
    /// consumed and this always returns `None`.
    pub fn poll(&mut self) -> Option<LinkEvent> {
        if !self.config.use_packets {
            return None;
        }

        let rx = &mut self.rx;
        let assembled = self.assembler.pull(|| rx.read())?;
        Some(self.dispatch(assembled))
    }

    /// Drain the ring, handling every frame in it. Returns the number of
    /// frames handled.
    pub fn poll_all(&mut self) -> usize {
        let mut frames = 0;
        while self.poll().is_some() {
            frames += 1;
        }
        frames
    }

    /// Handle all buffered bytes, then hand out the oldest queued packet.
    pub fn read_next_packet(&mut self) -> Option<Packet> {
        self.poll_all();
        self.queue.dequeue()
    }

    /// True if a received packet is waiting.
    #[inline]
    pub fn packet_available(&self) -> bool {
        self.queue.is_available()
    }

    /// Take the oldest received packet without touching the ring.
    #[inline]
    pub fn dequeue_packet(&mut self) -> Option<Packet> {
        self.queue.dequeue()
    }

    /// Number of received packets waiting.
    #[inline]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Take one byte straight from the ring, bypassing the assembler.
    ///
    /// Meant for raw mode. In packet mode this steals bytes from the frame
    /// being assembled.
    #[inline]
    pub fn read_raw(&mut self) -> Option<u8> {
        self.rx.read()
    }

    /// Drop buffered bytes, any partial frame and all queued packets.
    ///
    /// Counters and the last transmitted frame are kept.
    pub fn reset(&mut self) {
        while self.rx.read().is_some() {}
        self.assembler.reset();
        self.queue.clear();
        debug!("line {}: link reset", self.config.line.index());
    }

    fn dispatch(&mut self, assembled: Assembled) -> LinkEvent {
        let line = self.config.line.index();

        match assembled {
            Assembled::Corrupt { expected, received } => {
                warn!(
                    "line {}: crc mismatch, computed {:#x} received {:#x}",
                    line, expected, received
                );
                LinkStats::bump(&mut self.stats.crc_errors);
                self.reply(&Packet::retx());
                LinkEvent::Corrupted
            }
            Assembled::Desync { length } => {
                warn!("line {}: length byte {} out of range, resyncing", line, length);
                LinkStats::bump(&mut self.stats.desyncs);
                LinkEvent::Desync
            }
            Assembled::Valid(packet) => match packet.kind() {
                PacketKind::Ack => {
                    trace!("line {}: ack", line);
                    LinkStats::bump(&mut self.stats.acks_received);
                    LinkEvent::Acknowledged
                }
                PacketKind::Retx => {
                    debug!("line {}: retransmit requested", line);
                    LinkStats::bump(&mut self.stats.retx_received);
                    self.reply(&Packet::retx());
                    LinkEvent::RetransmitRequested
                }
                PacketKind::Data => {
                    if self.queue.enqueue(packet) {
                        trace!("line {}: frame accepted, {} bytes", line, packet.length);
                        LinkStats::bump(&mut self.stats.frames_accepted);
                        self.reply(&Packet::ack());
                        LinkEvent::Received
                    } else {
                        warn!("line {}: queue full, frame dropped", line);
                        LinkStats::bump(&mut self.stats.dropped_queue_full);
                        LinkEvent::Dropped(packet)
                    }
                }
            },
        }
    }

    /// Send a control frame. Failures are counted, never propagated.
    fn reply(&mut self, packet: &Packet) {
        if let Err(e) = self.transmit(packet) {
            warn!(
                "line {}: control reply failed: {:?}",
                self.config.line.index(),
                e
            );
            LinkStats::bump(&mut self.stats.send_errors);
        }
    }

    // ---- transmit ----

    /// Put one packet on the wire and remember it for [`Link::resend_last`].
    ///
    /// # Errors
    ///
    /// [`PacketError::PayloadTooLarge`](packet_proto::PacketError::PayloadTooLarge)
    /// if `length` exceeds the data area (nothing is sent or cached), or the
    /// sink's error. A frame that fails part way is still cached.
    pub fn write_frame(&mut self, packet: &Packet) -> Result<(), LinkError> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = packet.encode(&mut buf)?;

        self.last_transmitted = Some(*packet);
        self.send_encoded(&buf[..len])
    }

    /// Fragment `payload` and send every piece. Returns the number of frames.
    ///
    /// An empty payload still sends one zero-length frame.
    ///
    /// # Errors
    ///
    /// Stops at the first frame the sink refuses.
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<usize, LinkError> {
        let mut frames = 0;
        for packet in fragment(payload) {
            self.write_frame(&packet)?;
            frames += 1;
        }
        Ok(frames)
    }

    /// [`Link::send_payload`] for UTF-8 text.
    ///
    /// # Errors
    ///
    /// Same as [`Link::send_payload`].
    #[inline]
    pub fn send_text(&mut self, text: &str) -> Result<usize, LinkError> {
        self.send_payload(text.as_bytes())
    }

    /// Last frame sent with [`Link::write_frame`], if any.
    #[inline]
    pub fn last_transmitted(&self) -> Option<&Packet> {
        self.last_transmitted.as_ref()
    }

    /// Send the last transmitted frame again. Returns `false` if nothing has
    /// been sent yet.
    ///
    /// # Errors
    ///
    /// The sink's error.
    pub fn resend_last(&mut self) -> Result<bool, LinkError> {
        let Some(packet) = self.last_transmitted else {
            return Ok(false);
        };
        debug!("line {}: resending last frame", self.config.line.index());
        self.transmit(&packet)?;
        Ok(true)
    }

    /// Write bytes unframed.
    ///
    /// # Errors
    ///
    /// The sink's error.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.sink.send_bytes(bytes)?;
        Ok(())
    }

    fn transmit(&mut self, packet: &Packet) -> Result<(), LinkError> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = packet.encode(&mut buf)?;
        self.send_encoded(&buf[..len])
    }

    fn send_encoded(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        for &byte in frame {
            self.sink.send_byte(byte)?;
        }
        LinkStats::bump(&mut self.stats.frames_sent);
        trace!(
            "line {}: frame sent, {} bytes",
            self.config.line.index(),
            frame.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::error::SendError;
    use crate::ring::{Producer, RingBuffer};
    use packet_proto::{PacketError, MAX_PAYLOAD_SIZE};
    use std::vec::Vec;

    type Capture = heapless::Vec<u8, 128>;
    type TestLink<'a> = Link<'a, Capture, 32>;

    fn wire(packet: &Packet) -> Vec<u8> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = packet.encode(&mut buf).unwrap();
        buf[..len].to_vec()
    }

    fn feed<const N: usize>(producer: &mut Producer<'_, N>, bytes: &[u8]) {
        for &b in bytes {
            assert!(producer.write(b), "ring overflow");
        }
    }

    fn drain<const N: usize>(link: &mut Link<'_, Capture, N>) -> Vec<u8> {
        let bytes = link.sink().to_vec();
        link.sink_mut().clear();
        bytes
    }

    #[test]
    fn test_round_trip_every_length_acks_once() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        for len in 0..=MAX_PAYLOAD_SIZE {
            let payload: Vec<u8> = (0..len as u8).map(|b| b + 0x20).collect();
            let packet = Packet::new(&payload).unwrap();
            feed(&mut producer, &wire(&packet));

            let received = link.read_next_packet().expect("packet");
            assert_eq!(received.payload(), payload.as_slice());
            assert!(!link.packet_available(), "enqueued more than once");
            assert_eq!(drain(&mut link), wire(&Packet::ack()));
        }
        assert_eq!(link.stats().frames_accepted, MAX_PAYLOAD_SIZE as u32 + 1);
    }

    #[test]
    fn test_crc_bit_flip_sends_retx_and_skips_queue() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        let packet = Packet::new(b"payload").unwrap();
        for bit in 0..8 {
            let mut bytes = wire(&packet);
            let last = bytes.len() - 1;
            bytes[last] ^= 1 << bit;
            feed(&mut producer, &bytes);

            assert_eq!(link.poll(), Some(LinkEvent::Corrupted));
            assert!(!link.packet_available());
            assert_eq!(drain(&mut link), wire(&Packet::retx()));
        }
        assert_eq!(link.stats().crc_errors, 8);
        assert_eq!(link.stats().frames_accepted, 0);
    }

    #[test]
    fn test_full_queue_drops_silently() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        for i in 0..7u8 {
            feed(&mut producer, &wire(&Packet::new(&[b'a' + i]).unwrap()));
        }
        assert_eq!(link.poll_all(), 7);
        assert_eq!(link.queued(), 7);
        drain(&mut link);

        let extra = Packet::new(b"z").unwrap();
        feed(&mut producer, &wire(&extra));
        assert_eq!(link.poll(), Some(LinkEvent::Dropped(extra)));
        assert!(drain(&mut link).is_empty(), "no ACK or RETX when dropping");
        assert_eq!(link.stats().dropped_queue_full, 1);

        // Oldest packets are intact.
        assert_eq!(link.dequeue_packet().unwrap().payload(), b"a");
    }

    #[test]
    fn test_sentinels_never_queued() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        feed(&mut producer, &wire(&Packet::ack()));
        assert_eq!(link.poll(), Some(LinkEvent::Acknowledged));
        assert!(drain(&mut link).is_empty());

        feed(&mut producer, &wire(&Packet::retx()));
        assert_eq!(link.poll(), Some(LinkEvent::RetransmitRequested));
        assert_eq!(drain(&mut link), wire(&Packet::retx()));

        assert!(!link.packet_available());
        assert_eq!(link.stats().acks_received, 1);
        assert_eq!(link.stats().retx_received, 1);
    }

    #[test]
    fn test_partial_frame_survives_between_polls() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        let bytes = wire(&Packet::new(b"halves").unwrap());
        let (head, tail) = bytes.split_at(3);

        feed(&mut producer, head);
        assert_eq!(link.poll(), None);
        assert_eq!(link.read_next_packet(), None);

        feed(&mut producer, tail);
        assert_eq!(link.read_next_packet().unwrap().payload(), b"halves");
    }

    #[test]
    fn test_desync_then_recovers() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        feed(&mut producer, &[0x40]);
        feed(&mut producer, &wire(&Packet::new(b"ok").unwrap()));

        assert_eq!(link.poll(), Some(LinkEvent::Desync));
        assert!(drain(&mut link).is_empty());
        assert_eq!(link.poll(), Some(LinkEvent::Received));
        assert_eq!(link.stats().desyncs, 1);
    }

    #[test]
    fn test_write_frame_caches_but_replies_do_not() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        assert_eq!(link.resend_last(), Ok(false));

        assert_eq!(link.send_text("hi"), Ok(1));
        let hi = Packet::new(b"hi").unwrap();
        assert_eq!(drain(&mut link), wire(&hi));

        // Receiving a data frame sends an ACK, which must not displace "hi".
        feed(&mut producer, &wire(&Packet::new(b"x").unwrap()));
        link.poll_all();
        assert_eq!(drain(&mut link), wire(&Packet::ack()));
        assert_eq!(link.last_transmitted(), Some(&hi));

        assert_eq!(link.resend_last(), Ok(true));
        assert_eq!(drain(&mut link), wire(&hi));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut ring = RingBuffer::<32>::new();
        let (_producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        let bad = Packet::blank(MAX_PAYLOAD_SIZE as u8 + 1);
        assert_eq!(
            link.write_frame(&bad),
            Err(LinkError::Packet(PacketError::PayloadTooLarge))
        );
        assert!(link.sink().is_empty());
        assert_eq!(link.last_transmitted(), None);
    }

    #[test]
    fn test_empty_payload_sends_zero_length_frame() {
        let mut ring = RingBuffer::<32>::new();
        let (_producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        assert_eq!(link.send_payload(&[]), Ok(1));
        let empty = Packet::new(&[]).unwrap();
        assert_eq!(drain(&mut link), [0, empty.crc]);
    }

    #[test]
    fn test_reply_failure_is_counted_not_fatal() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let mut link: Link<'_, heapless::Vec<u8, 2>, 32> =
            Link::new(LinkConfig::default(), consumer, heapless::Vec::new()).unwrap();

        feed(&mut producer, &wire(&Packet::new(b"data").unwrap()));
        assert_eq!(link.poll(), Some(LinkEvent::Received));
        assert_eq!(link.stats().send_errors, 1);
        assert!(link.packet_available());

        assert_eq!(
            link.send_text("more"),
            Err(LinkError::Send(SendError::Busy))
        );
    }

    #[test]
    fn test_raw_mode_leaves_bytes_alone() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let config = LinkConfig::default().with_packets(false);
        let mut link: TestLink<'_> = Link::new(config, consumer, Capture::new()).unwrap();

        let frame = wire(&Packet::new(b"raw").unwrap());
        feed(&mut producer, &frame);

        assert_eq!(link.read_next_packet(), None);
        let read: Vec<u8> = core::iter::from_fn(|| link.read_raw()).collect();
        assert_eq!(read, frame);

        link.send_raw(b"abc").unwrap();
        assert_eq!(drain(&mut link), b"abc");
    }

    #[test]
    fn test_reset_discards_state() {
        let mut ring = RingBuffer::<32>::new();
        let (mut producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();

        feed(&mut producer, &wire(&Packet::new(b"q").unwrap()));
        link.poll_all();
        feed(&mut producer, &[5, 1, 2]);
        link.poll_all();

        link.reset();
        assert!(!link.packet_available());

        feed(&mut producer, &wire(&Packet::new(b"fresh").unwrap()));
        assert_eq!(link.read_next_packet().unwrap().payload(), b"fresh");
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let mut ring = RingBuffer::<32>::new();
        let (_producer, consumer) = ring.split();
        let config = LinkConfig::default().with_baudrate(0);
        let result: Result<TestLink<'_>, _> = Link::new(config, consumer, Capture::new());
        assert_eq!(result.err(), Some(ConfigError::InvalidBaudrate(0)));

        let mut ring = RingBuffer::<32>::new();
        let (_producer, consumer) = ring.split();
        let result: Result<Link<'_, Capture, 32, 6>, _> =
            Link::new(LinkConfig::default(), consumer, Capture::new());
        assert_eq!(result.err(), Some(ConfigError::CapacityNotPowerOfTwo(6)));
    }

    #[test]
    fn test_into_parts_returns_sink() {
        let mut ring = RingBuffer::<32>::new();
        let (_producer, consumer) = ring.split();
        let mut link: TestLink<'_> =
            Link::new(LinkConfig::default(), consumer, Capture::new()).unwrap();
        link.send_raw(&[1, 2]).unwrap();

        let (_consumer, sink) = link.into_parts();
        assert_eq!(sink.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_two_links_exchange_fragmented_payload() {
        let mut ring_a = RingBuffer::<64>::new();
        let mut ring_b = RingBuffer::<64>::new();
        let (mut to_a, rx_a) = ring_a.split();
        let (mut to_b, rx_b) = ring_b.split();

        let line1 = LineId::new(1).unwrap();
        let mut a: Link<'_, Capture, 64> =
            Link::new(LinkConfig::default(), rx_a, Capture::new()).unwrap();
        let mut b: Link<'_, Capture, 64> =
            Link::new(LinkConfig::for_line(line1), rx_b, Capture::new()).unwrap();

        let payload: Vec<u8> = (0..30u8).collect();
        assert_eq!(a.send_payload(&payload), Ok(3));

        let sent = drain(&mut a);
        assert_eq!(sent.len(), 16 + 16 + 4);
        feed(&mut to_b, &sent);

        let mut reassembled = Vec::new();
        while let Some(packet) = b.read_next_packet() {
            reassembled.extend_from_slice(packet.payload());
        }
        assert_eq!(reassembled, payload);

        // Three ACKs travel back.
        feed(&mut to_a, &drain(&mut b));
        assert_eq!(a.poll_all(), 3);
        assert_eq!(a.stats().acks_received, 3);
        assert!(!a.packet_available());

        // A corrupted frame from b makes a request a retransmission, and b
        // answers by resending its last frame.
        b.send_text("late").unwrap();
        let mut frame = drain(&mut b);
        frame[1] ^= 0x01;
        feed(&mut to_a, &frame);
        assert_eq!(a.poll(), Some(LinkEvent::Corrupted));

        feed(&mut to_b, &drain(&mut a));
        assert_eq!(b.poll(), Some(LinkEvent::RetransmitRequested));
        assert!(b.resend_last().unwrap());

        // b echoed a RETX before resending; a sees it first, then the frame.
        feed(&mut to_a, &drain(&mut b));
        assert_eq!(a.poll(), Some(LinkEvent::RetransmitRequested));
        assert_eq!(a.poll(), Some(LinkEvent::Received));
        assert_eq!(a.dequeue_packet().unwrap().payload(), b"late");
        assert_eq!(b.line(), line1);
    }
}
