//! Reliable packet link over UART for RP2040.
//!
//! Hardware glue around [`link_core`]: a receive pump that feeds the ring
//! buffer from the UART, a [`ByteSink`](link_core::ByteSink) over the UART
//! transmitter, and the mapping from [`LinkConfig`] to the HAL's UART
//! settings.

#![no_std]

pub use link_core::{
    Consumer, Link, LinkConfig, LinkEvent, LinkStats, Producer, RingBuffer,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_RING_CAPACITY,
};
pub use packet_proto::Packet;

pub mod uart;

pub use uart::{uart_config, RxPump, UartSink};
