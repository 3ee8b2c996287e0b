//! Platform-agnostic reliable packet link over an interrupt-fed serial line.
//!
//! This crate has no hardware dependencies. The firmware wires it to a UART;
//! host tests wire two links back to back.
//!
//! # Overview
//!
//! - [`ring`]: lock-free SPSC byte buffer between the receive interrupt and
//!   the polled side ([`RingBuffer`], [`Producer`], [`Consumer`])
//! - [`assembler`]: resumable byte-at-a-time frame reassembly ([`Assembler`])
//! - [`queue`]: bounded queue of received packets ([`PacketQueue`])
//! - [`link`]: ACK/RETX handling, fragmentation and resend ([`Link`])
//! - [`sink`]: outgoing byte transport ([`ByteSink`])
//! - [`config`]: per-line settings ([`LinkConfig`])
//!
//! # Example
//!
//! ```
//! use link_core::{Link, LinkConfig, LinkEvent, RingBuffer};
//! use packet_proto::Packet;
//!
//! let mut ring = RingBuffer::<32>::new();
//! let (mut producer, consumer) = ring.split();
//! let mut link: Link<'_, heapless::Vec<u8, 64>> =
//!     Link::new(LinkConfig::default(), consumer, heapless::Vec::new()).unwrap();
//!
//! // What the UART interrupt would do:
//! let mut frame = [0u8; packet_proto::MAX_FRAME_SIZE];
//! let len = Packet::new(b"hello").unwrap().encode(&mut frame).unwrap();
//! for &byte in &frame[..len] {
//!     producer.write(byte);
//! }
//!
//! assert_eq!(link.poll(), Some(LinkEvent::Received));
//! assert_eq!(link.dequeue_packet().unwrap().payload(), b"hello");
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt and derive `defmt::Format` (embedded)
//! - **`log`**: Log through the `log` facade (host tools)
//! - **`heapless`**: Forwarded to `packet-proto`
//! - **`embedded-io`**: Enable [`IoSink`]

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod assembler;
pub mod config;
pub mod error;
pub mod link;
pub mod queue;
pub mod ring;
pub mod sink;
pub mod stats;

pub use assembler::{Assembled, Assembler, Phase};
pub use config::{
    DataBits, LineId, LinkConfig, Parity, StopBits, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_RING_CAPACITY, MAX_LINES,
};
pub use error::{ConfigError, LinkError, SendError};
pub use link::Link;
pub use queue::PacketQueue;
pub use ring::{Consumer, Producer, RingBuffer};
#[cfg(feature = "embedded-io")]
pub use sink::IoSink;
pub use sink::ByteSink;
pub use stats::{LinkEvent, LinkStats};
