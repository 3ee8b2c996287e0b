//! CRC-8 checksum for packet integrity.
//!
//! The link uses polynomial `0x07` with a zero seed, no reflection and no
//! final XOR. That parameter set is CRC-8/SMBUS, so the calculation is
//! table-driven through the `crc` crate.

use crc::{Crc, CRC_8_SMBUS};

/// CRC-8/SMBUS calculator with 256-byte lookup table.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Calculate the CRC-8 checksum of a byte slice.
#[inline]
#[must_use]
pub fn calculate_crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

/// CRC-8 digest for incremental calculation.
///
/// Use this when the covered bytes arrive one at a time.
pub struct Crc8Digest {
    digest: crc::Digest<'static, u8>,
}

impl Crc8Digest {
    /// Create a new CRC-8 digest.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            digest: CRC8.digest(),
        }
    }

    /// Update the digest with a single byte.
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.digest.update(&[byte]);
    }

    /// Update the digest with a byte slice.
    #[inline]
    pub fn update_slice(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// Finalize and return the checksum value.
    #[inline]
    #[must_use]
    pub fn finalize(self) -> u8 {
        self.digest.finalize()
    }
}

impl Default for Crc8Digest {
    fn default() -> Self {
        Self::new()
    }
}
