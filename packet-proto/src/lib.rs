//! Packet format for the reliable serial link.
//!
//! This crate holds everything that both ends of the link must agree on
//! bit for bit:
//!
//! - **CRC**: [`calculate_crc8()`] and [`Crc8Digest`] (polynomial `0x07`, seed 0)
//! - **Packets**: [`Packet`], its fixed layout constants, and the
//!   [`Packet::ack()`] / [`Packet::retx()`] control sentinels
//! - **Fragmentation**: [`fragment()`] splits long payloads into packets
//!
//! # Wire Format
//!
//! ```text
//! [length:1][data:length][crc:1]
//! ```
//!
//! `length` is 0-14. The CRC is computed over a 14-byte in-memory region:
//! the length byte followed by the data area, where unused data bytes are
//! `0xFF`. Fill bytes never travel on the wire.
//!
//! # Example
//!
//! ```
//! use packet_proto::{Packet, PacketKind};
//!
//! let packet = Packet::new(b"ping").unwrap();
//! let mut buf = [0u8; packet_proto::MAX_FRAME_SIZE];
//! let len = packet.encode(&mut buf).unwrap();
//! assert_eq!(len, 6);
//!
//! let (decoded, _) = Packet::decode(&buf[..len]).unwrap();
//! assert_eq!(decoded.payload(), b"ping");
//! assert_eq!(decoded.kind(), PacketKind::Data);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`heapless`**: Enable [`Packet::encode_to_vec()`]
//! - **`embedded-io`**: Enable [`Packet::encode_io()`] for I/O peripherals

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod crc;
pub mod fragment;
pub mod packet;

pub use crc::{calculate_crc8, Crc8Digest};
pub use fragment::{fragment, frame_count, Fragments};
pub use packet::{
    Packet, PacketError, PacketKind, ACK_MARKER, FILL_BYTE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
    PACKET_DATA_LENGTH, PACKET_LENGTH, RETX_MARKER,
};
