//! Fixed-layout packet, control sentinels, and wire encoding.
//!
//! In memory every packet occupies [`PACKET_DATA_LENGTH`] bytes:
//!
//! ```text
//! ┌────────┬──────────────────────────────┬─────┐
//! │ LENGTH │ DATA (14 bytes, 0xFF filled) │ CRC │
//! │ 1B     │ 14B                          │ 1B  │
//! └────────┴──────────────────────────────┴─────┘
//! ```
//!
//! The CRC covers the first [`PACKET_LENGTH`] bytes of that layout, fill
//! bytes included. On the wire only `LENGTH`, the first `LENGTH` data bytes,
//! and `CRC` are sent; the receiver restores the fill before checking.

use crate::crc::calculate_crc8;

/// Size of the fixed in-memory packet layout.
pub const PACKET_DATA_LENGTH: usize = 16;

/// Number of leading layout bytes covered by the CRC.
pub const PACKET_LENGTH: usize = PACKET_DATA_LENGTH - 2;

/// Maximum number of payload bytes per packet.
pub const MAX_PAYLOAD_SIZE: usize = PACKET_DATA_LENGTH - 2;

/// Largest frame that can appear on the wire (LENGTH + DATA + CRC).
pub const MAX_FRAME_SIZE: usize = 1 + MAX_PAYLOAD_SIZE + 1;

/// Pad value for data bytes beyond `length`.
pub const FILL_BYTE: u8 = 0xFF;

/// Payload byte of the retransmit-request control packet.
pub const RETX_MARKER: u8 = 0x11;

/// Payload byte of the acknowledgment control packet.
pub const ACK_MARKER: u8 = 0x12;

/// Errors from packet construction, encoding, and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Payload or declared length exceeds [`MAX_PAYLOAD_SIZE`].
    PayloadTooLarge,
    /// Output buffer is too small for the encoded frame.
    BufferTooSmall,
    /// A write to an I/O adapter failed.
    WriteError,
    /// Input ended before a complete frame.
    Truncated,
    /// Received CRC does not match the computed one.
    CrcMismatch,
}

impl core::fmt::Display for PacketError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PayloadTooLarge => write!(f, "payload too large"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::WriteError => write!(f, "write error"),
            Self::Truncated => write!(f, "truncated frame"),
            Self::CrcMismatch => write!(f, "crc mismatch"),
        }
    }
}

/// What a validated packet means to the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketKind {
    /// Application payload.
    Data,
    /// Peer accepted the previous frame.
    Ack,
    /// Peer asks for the previous frame again.
    Retx,
}

/// One frame in its fixed in-memory representation.
///
/// Equality compares the whole representation (length, all data bytes
/// including fill, and CRC), which is how control sentinels are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    /// Declared payload size (0-14).
    pub length: u8,
    /// Payload, filled with [`FILL_BYTE`] past `length`.
    pub data: [u8; MAX_PAYLOAD_SIZE],
    /// CRC-8 over the first [`PACKET_LENGTH`] layout bytes.
    pub crc: u8,
}

impl Default for Packet {
    fn default() -> Self {
        Self::blank(0)
    }
}

impl Packet {
    /// A packet with the given length byte and every other byte set to fill.
    ///
    /// This is the starting point for both framing and reassembly.
    #[must_use]
    pub const fn blank(length: u8) -> Self {
        Self {
            length,
            data: [FILL_BYTE; MAX_PAYLOAD_SIZE],
            crc: FILL_BYTE,
        }
    }

    /// Build a sealed packet carrying `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::PayloadTooLarge`] if `payload` is longer than
    /// [`MAX_PAYLOAD_SIZE`].
    pub fn new(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge);
        }

        let mut packet = Self::blank(payload.len() as u8);
        packet.data[..payload.len()].copy_from_slice(payload);
        packet.seal();
        Ok(packet)
    }

    /// Build a single-byte control packet.
    #[must_use]
    pub fn control(marker: u8) -> Self {
        let mut packet = Self::blank(1);
        packet.data[0] = marker;
        packet.seal();
        packet
    }

    /// The acknowledgment sentinel.
    #[must_use]
    pub fn ack() -> Self {
        Self::control(ACK_MARKER)
    }

    /// The retransmit-request sentinel.
    #[must_use]
    pub fn retx() -> Self {
        Self::control(RETX_MARKER)
    }

    /// The full in-memory layout: length, data, crc.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PACKET_DATA_LENGTH] {
        let mut bytes = [0u8; PACKET_DATA_LENGTH];
        bytes[0] = self.length;
        bytes[1..=MAX_PAYLOAD_SIZE].copy_from_slice(&self.data);
        bytes[PACKET_DATA_LENGTH - 1] = self.crc;
        bytes
    }

    /// The bytes covered by the CRC.
    #[must_use]
    pub fn crc_region(&self) -> [u8; PACKET_LENGTH] {
        let mut region = [0u8; PACKET_LENGTH];
        region.copy_from_slice(&self.to_bytes()[..PACKET_LENGTH]);
        region
    }

    /// CRC-8 of the covered region as it currently stands.
    #[inline]
    #[must_use]
    pub fn compute_crc(&self) -> u8 {
        calculate_crc8(&self.crc_region())
    }

    /// Recompute and store the CRC.
    #[inline]
    pub fn seal(&mut self) {
        self.crc = self.compute_crc();
    }

    /// True if the stored CRC matches the covered region.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.crc == self.compute_crc()
    }

    /// The declared payload bytes, clamped to the data area.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        let len = (self.length as usize).min(MAX_PAYLOAD_SIZE);
        &self.data[..len]
    }

    /// Classify against the control sentinels.
    #[must_use]
    pub fn kind(&self) -> PacketKind {
        if *self == Self::retx() {
            PacketKind::Retx
        } else if *self == Self::ack() {
            PacketKind::Ack
        } else {
            PacketKind::Data
        }
    }

    /// Number of bytes this packet occupies on the wire.
    #[inline]
    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.length as usize + 2
    }

    /// Encode the wire form (length, declared data bytes, crc) into `buf`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::PayloadTooLarge`] if `length` exceeds the data
    /// area, or [`PacketError::BufferTooSmall`] if `buf` can not hold the frame.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, PacketError> {
        let len = self.length as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge);
        }
        let frame_len = len + 2;
        if buf.len() < frame_len {
            return Err(PacketError::BufferTooSmall);
        }

        buf[0] = self.length;
        buf[1..=len].copy_from_slice(&self.data[..len]);
        buf[len + 1] = self.crc;
        Ok(frame_len)
    }

    /// Encode the wire form into a `heapless::Vec`.
    ///
    /// # Errors
    ///
    /// Same as [`Packet::encode`].
    #[cfg(feature = "heapless")]
    pub fn encode_to_vec(&self) -> Result<heapless::Vec<u8, MAX_FRAME_SIZE>, PacketError> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buf)?;
        heapless::Vec::from_slice(&buf[..len]).map_err(|_| PacketError::BufferTooSmall)
    }

    /// Encode the wire form to an `embedded_io::Write` implementation.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::WriteError`] if the write fails.
    #[cfg(feature = "embedded-io")]
    pub fn encode_io<W: embedded_io::Write>(&self, writer: &mut W) -> Result<(), PacketError> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buf)?;
        writer
            .write_all(&buf[..len])
            .map_err(|_| PacketError::WriteError)
    }

    /// Decode one complete wire frame from the start of `bytes`.
    ///
    /// Returns the packet and the number of bytes consumed. This is the
    /// whole-buffer counterpart of the byte-at-a-time assembler.
    ///
    /// # Errors
    ///
    /// [`PacketError::PayloadTooLarge`] for an impossible length byte,
    /// [`PacketError::Truncated`] if `bytes` ends early, and
    /// [`PacketError::CrcMismatch`] if the CRC does not check.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), PacketError> {
        let length = *bytes.first().ok_or(PacketError::Truncated)?;
        let len = length as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge);
        }
        if bytes.len() < len + 2 {
            return Err(PacketError::Truncated);
        }

        let mut packet = Self::blank(length);
        packet.data[..len].copy_from_slice(&bytes[1..=len]);
        packet.crc = bytes[len + 1];

        if !packet.is_valid() {
            return Err(PacketError::CrcMismatch);
        }
        Ok((packet, len + 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(PACKET_DATA_LENGTH, 16);
        assert_eq!(PACKET_LENGTH, 14);
        assert_eq!(MAX_PAYLOAD_SIZE, 14);
        assert_eq!(MAX_FRAME_SIZE, 16);
    }

    #[test]
    fn test_new_pads_with_fill() {
        let packet = Packet::new(b"hi").unwrap();
        assert_eq!(packet.length, 2);
        assert_eq!(&packet.data[..2], b"hi");
        assert!(packet.data[2..].iter().all(|&b| b == FILL_BYTE));
        assert_eq!(packet.crc, 0x4D);
        assert!(packet.is_valid());
    }

    #[test]
    fn test_crc_covers_fill_not_last_data_byte() {
        let packet = Packet::new(&[0u8; MAX_PAYLOAD_SIZE]).unwrap();
        let region = packet.crc_region();
        assert_eq!(region[0], MAX_PAYLOAD_SIZE as u8);
        assert_eq!(region.len(), PACKET_LENGTH);

        // The 14th data byte sits outside the covered region.
        let mut tweaked = packet;
        tweaked.data[MAX_PAYLOAD_SIZE - 1] = 0xAB;
        assert!(tweaked.is_valid());

        // Any covered byte is checked.
        let mut tweaked = packet;
        tweaked.data[0] = 0x01;
        assert!(!tweaked.is_valid());
    }

    #[test]
    fn test_empty_payload() {
        let packet = Packet::new(&[]).unwrap();
        assert_eq!(packet.length, 0);
        assert_eq!(packet.crc, 0xA3);
        assert!(packet.payload().is_empty());
    }

    #[test]
    fn test_payload_too_large() {
        let payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(Packet::new(&payload), Err(PacketError::PayloadTooLarge));
    }

    #[test]
    fn test_sentinels() {
        let ack = Packet::ack();
        assert_eq!(ack.length, 1);
        assert_eq!(ack.data[0], ACK_MARKER);
        assert_eq!(ack.crc, 0xC4);
        assert_eq!(ack.kind(), PacketKind::Ack);

        let retx = Packet::retx();
        assert_eq!(retx.data[0], RETX_MARKER);
        assert_eq!(retx.crc, 0x7F);
        assert_eq!(retx.kind(), PacketKind::Retx);
    }

    #[test]
    fn test_sentinel_compare_uses_fill_bytes() {
        // Same length and marker byte, but a non-fill byte in the padding.
        let mut packet = Packet::ack();
        packet.data[5] = 0x00;
        packet.seal();
        assert_eq!(packet.kind(), PacketKind::Data);
    }

    #[test]
    fn test_encode_sends_only_declared_bytes() {
        let packet = Packet::new(&[1, 2, 3]).unwrap();
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = packet.encode(&mut buf).unwrap();

        assert_eq!(len, 5);
        assert_eq!(&buf[..len], &[3, 1, 2, 3, packet.crc]);
        assert_eq!(packet.wire_len(), len);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let packet = Packet::new(&[1, 2, 3]).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(packet.encode(&mut buf), Err(PacketError::BufferTooSmall));
    }

    #[test]
    fn test_encode_rejects_bad_length() {
        let mut packet = Packet::blank(MAX_PAYLOAD_SIZE as u8 + 1);
        packet.seal();
        let mut buf = [0u8; 32];
        assert_eq!(packet.encode(&mut buf), Err(PacketError::PayloadTooLarge));
    }

    #[test]
    fn test_decode_restores_fill() {
        let original = Packet::new(b"abc").unwrap();
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = original.encode(&mut buf).unwrap();

        let (decoded, used) = Packet::decode(&buf[..len]).unwrap();
        assert_eq!(used, len);
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(Packet::decode(&[]), Err(PacketError::Truncated));
        assert_eq!(Packet::decode(&[3, 1, 2]), Err(PacketError::Truncated));
        assert_eq!(Packet::decode(&[15, 0, 0]), Err(PacketError::PayloadTooLarge));

        let packet = Packet::new(&[7]).unwrap();
        let bad = [1, 7, packet.crc ^ 0x01];
        assert_eq!(Packet::decode(&bad), Err(PacketError::CrcMismatch));
    }

    #[test]
    fn test_to_bytes_layout() {
        let packet = Packet::new(&[0xAA]).unwrap();
        let bytes = packet.to_bytes();
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], 0xAA);
        assert_eq!(bytes[2], FILL_BYTE);
        assert_eq!(bytes[PACKET_DATA_LENGTH - 1], packet.crc);
    }
}
