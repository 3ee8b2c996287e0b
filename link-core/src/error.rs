//! Error types for link setup and transmission.

use packet_proto::PacketError;

/// Rejected configuration. Constructors return this instead of a
/// partially configured object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Buffer or queue capacity is zero or not a power of two.
    CapacityNotPowerOfTwo(usize),
    /// Line number outside `0..MAX_LINES`.
    InvalidLine(u8),
    /// Baud rate of zero.
    InvalidBaudrate(u32),
    /// Framing other than 8 data bits can not carry packet bytes.
    InvalidDataBits,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CapacityNotPowerOfTwo(n) => write!(f, "capacity {n} is not a power of two"),
            Self::InvalidLine(n) => write!(f, "invalid line number {n}"),
            Self::InvalidBaudrate(b) => write!(f, "invalid baud rate {b}"),
            Self::InvalidDataBits => write!(f, "packets require 8 data bits"),
        }
    }
}

/// Error reported by a [`ByteSink`](crate::sink::ByteSink).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// Transport I/O failure.
    Io,
    /// Transport can not take another byte right now.
    Busy,
}

impl core::fmt::Display for SendError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "transport i/o error"),
            Self::Busy => write!(f, "transport busy"),
        }
    }
}

/// Error type for link send operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The packet could not be encoded.
    Packet(PacketError),
    /// The byte sink failed.
    Send(SendError),
}

impl From<PacketError> for LinkError {
    fn from(err: PacketError) -> Self {
        LinkError::Packet(err)
    }
}

impl From<SendError> for LinkError {
    fn from(err: SendError) -> Self {
        LinkError::Send(err)
    }
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Packet(e) => write!(f, "packet: {e}"),
            Self::Send(e) => write!(f, "send: {e}"),
        }
    }
}
