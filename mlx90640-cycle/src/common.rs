// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Sensor geometry, addressing and the subpage pattern helpers.
//!
//! Notation follows the datasheet: α is a pixel's sensitivity, CP the shielded compensation
//! pixels, PTAT the proportional-to-absolute-temperature sensor, T<sub>a</sub> the ambient
//! temperature and T<sub>o</sub> an object (pixel) temperature. Constants are prefixed with K.
use core::fmt;

use crate::register::{AccessPattern, Subpage};

/// The width of the thermal image, in pixels.
pub const WIDTH: usize = 32;

/// The height of the thermal image, in pixels.
pub const HEIGHT: usize = 24;

/// The total number of pixels.
pub const NUM_PIXELS: usize = WIDTH * HEIGHT;

/// The number of 16-bit words in both the EEPROM dump and the RAM window.
///
/// For RAM this is the 768 pixels plus two extra rows of auxiliary measurements.
pub const NUM_WORDS: usize = 832;

/// The number of temperature ranges the object temperature calculation distinguishes.
pub const NUM_RANGES: usize = 4;

/// Types that can be loaded straight from a camera.
pub trait FromI2C<I2C> {
    type Error;
    type Ok;

    fn from_i2c(bus: &mut I2C, i2c_address: u8) -> Result<Self::Ok, Self::Error>;
}

/// A word address in the camera's memory map, sent big-endian at the start of every transfer.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct Address(u16);

impl Address {
    pub const fn new(address: u16) -> Self {
        Self(address)
    }

    /// The address `words` words further on.
    pub const fn offset(&self, words: u16) -> Self {
        Self(self.0 + words)
    }

    pub(crate) fn as_bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#X})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Address {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Address({=u16:#X})", self.0)
    }
}

impl From<u16> for Address {
    fn from(raw_address: u16) -> Self {
        Self::new(raw_address)
    }
}

impl From<Address> for u16 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl From<Address> for usize {
    fn from(address: Address) -> Self {
        address.0 as usize
    }
}

/// The subpage a pixel belongs to with the interleaved access pattern (row parity).
pub fn interleave_pattern(pixel_index: usize) -> Subpage {
    if (pixel_index / WIDTH) % 2 == 0 {
        Subpage::Zero
    } else {
        Subpage::One
    }
}

/// The subpage a pixel belongs to with the chess board access pattern.
pub fn chess_pattern(pixel_index: usize) -> Subpage {
    let row_parity = (pixel_index / WIDTH) % 2;
    let column_parity = pixel_index % 2;
    if row_parity ^ column_parity == 0 {
        Subpage::Zero
    } else {
        Subpage::One
    }
}

/// The subpage a pixel is updated in for the given access pattern.
pub fn pixel_subpage(pixel_index: usize, access_pattern: AccessPattern) -> Subpage {
    match access_pattern {
        AccessPattern::Chess => chess_pattern(pixel_index),
        AccessPattern::Interleave => interleave_pattern(pixel_index),
    }
}

/// The "conversion pattern" used when correcting for a mismatched access pattern.
///
/// It cycles through 0, -1, 0, 1 along a row, and is negated on odd rows.
pub fn conversion_pattern(pixel_index: usize) -> i8 {
    let base = match pixel_index % 4 {
        1 => -1,
        3 => 1,
        _ => 0,
    };
    if interleave_pattern(pixel_index) == Subpage::One {
        -base
    } else {
        base
    }
}

/// The per-range sensitivity correction, Alpha<sub>corr<sub>range<sub>n</sub></sub></sub>.
///
/// The basic range is 1. Each range further out multiplies (or, going down, divides) by one more
/// `1 + K_STo * (width of the range in between)` factor.
pub(crate) fn alpha_correction_coefficients(
    basic_range: usize,
    corner_temperatures: &[i16],
    k_s_to: &[f32],
) -> [f32; NUM_RANGES] {
    let range_factor =
        |n: usize| 1f32 + k_s_to[n] * f32::from(corner_temperatures[n + 1] - corner_temperatures[n]);
    let mut corrections = [1f32; NUM_RANGES];
    for n in (0..basic_range).rev() {
        corrections[n] = corrections[n + 1] / range_factor(n);
    }
    for n in (basic_range + 1)..NUM_RANGES {
        corrections[n] = corrections[n - 1] * range_factor(n - 1);
    }
    corrections
}
