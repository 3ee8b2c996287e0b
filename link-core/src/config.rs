//! Link configuration.
//!
//! Capacities are compile-time const generics; everything that may differ
//! between boards or peers lives in [`LinkConfig`].

use crate::error::ConfigError;

/// Default ring buffer capacity in bytes.
pub const DEFAULT_RING_CAPACITY: usize = 32;

/// Default packet queue capacity. One slot stays unused, so this holds 7.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Number of UART lines a board may run links on.
pub const MAX_LINES: u8 = 3;

/// Identifies a UART line, `0..MAX_LINES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineId(u8);

impl LineId {
    /// Validate a line number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLine`] if `n >= MAX_LINES`.
    pub const fn new(n: u8) -> Result<Self, ConfigError> {
        if n < MAX_LINES {
            Ok(Self(n))
        } else {
            Err(ConfigError::InvalidLine(n))
        }
    }

    /// Raw line number.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for LineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "line{}", self.0)
    }
}

/// Number of data bits per UART character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// Parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

/// Per-line settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// UART line this link runs on.
    pub line: LineId,
    /// Baud rate in bits per second.
    pub baudrate: u32,
    /// Data bits per character.
    pub data_bits: DataBits,
    /// Parity mode.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Frame traffic into packets. When false the link passes raw bytes.
    pub use_packets: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            line: LineId::default(),
            baudrate: 115_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            use_packets: true,
        }
    }
}

impl LinkConfig {
    /// Default settings on the given line.
    #[must_use]
    pub fn for_line(line: LineId) -> Self {
        Self {
            line,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = baudrate;
        self
    }

    #[must_use]
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    #[must_use]
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    #[must_use]
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    #[must_use]
    pub fn with_packets(mut self, use_packets: bool) -> Self {
        self.use_packets = use_packets;
        self
    }

    /// Check the settings can carry link traffic.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidBaudrate`] for a zero baud rate.
    /// - [`ConfigError::InvalidDataBits`] for packet mode with fewer than
    ///   8 data bits, since the CRC and length bytes use all 8.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baudrate == 0 {
            return Err(ConfigError::InvalidBaudrate(self.baudrate));
        }
        if self.use_packets && self.data_bits != DataBits::Eight {
            return Err(ConfigError::InvalidDataBits);
        }
        Ok(())
    }
}
