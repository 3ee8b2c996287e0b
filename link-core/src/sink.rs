//! Outgoing byte transport.

use crate::error::SendError;

/// Destination for outgoing link bytes.
///
/// Frames are written one byte at a time, matching how a UART data register
/// is fed. Implementations must not block indefinitely; a transport that can
/// not take a byte right now returns [`SendError::Busy`].
pub trait ByteSink {
    /// Send a single byte.
    fn send_byte(&mut self, byte: u8) -> Result<(), SendError>;

    /// Send every byte of `bytes`, stopping at the first failure.
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        bytes.iter().try_for_each(|&b| self.send_byte(b))
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    #[inline]
    fn send_byte(&mut self, byte: u8) -> Result<(), SendError> {
        (**self).send_byte(byte)
    }
}

/// Capture buffer, used for host tests and loopback wiring.
impl<const N: usize> ByteSink for heapless::Vec<u8, N> {
    fn send_byte(&mut self, byte: u8) -> Result<(), SendError> {
        self.push(byte).map_err(|_| SendError::Busy)
    }
}

/// Adapter for any blocking [`embedded_io::Write`] transport.
#[cfg(feature = "embedded-io")]
pub struct IoSink<W> {
    writer: W,
}

#[cfg(feature = "embedded-io")]
impl<W: embedded_io::Write> IoSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Borrow the wrapped writer.
    pub fn inner(&self) -> &W {
        &self.writer
    }

    /// Unwrap, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(feature = "embedded-io")]
impl<W: embedded_io::Write> ByteSink for IoSink<W> {
    fn send_byte(&mut self, byte: u8) -> Result<(), SendError> {
        self.writer.write_all(&[byte]).map_err(|_| SendError::Io)
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        self.writer.write_all(bytes).map_err(|_| SendError::Io)
    }
}
