// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Word addresses in the MLX90640 memory map.
//!
//! Names follow the datasheet's parameter names where a word holds a single parameter, and the
//! group of parameters otherwise.
use num_enum::IntoPrimitive;

use crate::common::Address;

// Discriminants are always written out, to make checking against the datasheet easier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive)]
#[repr(u16)]
pub(crate) enum EepromAddress {
    Base = 0x2400,

    /// Three words of unique ID.
    DeviceId = 0x2407,

    /// Bit 11 is clear when the camera was calibrated with the chess pattern.
    CalibrationPattern = 0x240A,

    /// α<sub>PTAT</sub> and the offset scales (remainder, column, row). Followed by the offset
    /// average, then six row words and eight column words of packed nibbles.
    OffsetScales = 0x2410,

    OffsetAverage = 0x2411,

    /// Same shape as [`OffsetScales`][EepromAddress::OffsetScales], for sensitivity (α).
    AlphaScales = 0x2420,

    AlphaReference = 0x2421,

    Gain = 0x2430,

    VPtat25 = 0x2431,

    /// K<sub>V<sub>PTAT</sub></sub> and K<sub>T<sub>PTAT</sub></sub>.
    KPtat = 0x2432,

    /// K<sub>V<sub>DD</sub></sub> (high byte) and V<sub>DD<sub>25</sub></sub> (low byte).
    Vdd = 0x2433,

    /// One K<sub>V</sub> nibble for each row and column parity.
    KvAverages = 0x2434,

    /// The interleaved/chess correction terms.
    InterlacedCorrection = 0x2435,

    /// K<sub>Ta</sub> averages for even (0-indexed) columns, even rows in the high byte.
    KtaAveragesEvenColumns = 0x2436,

    /// K<sub>Ta</sub> averages for odd (0-indexed) columns, even rows in the high byte.
    KtaAveragesOddColumns = 0x2437,

    /// The K<sub>V</sub> and K<sub>Ta</sub> scales, and the calibration ADC resolution.
    KvKtaScales = 0x2438,

    /// α for both compensation pixels.
    CpAlpha = 0x2439,

    /// Offsets for both compensation pixels.
    CpOffset = 0x243A,

    /// K<sub>V</sub> and K<sub>Ta</sub> for the compensation pixels.
    CpKvKta = 0x243B,

    /// K<sub>S<sub>Ta</sub></sub> (high byte) and the temperature gradient coefficient (low byte).
    KsTaTgc = 0x243C,

    /// K<sub>S<sub>To</sub></sub> for ranges 0 and 1.
    KsToLow = 0x243D,

    /// K<sub>S<sub>To</sub></sub> for ranges 2 and 3.
    KsToHigh = 0x243E,

    /// Corner temperatures 2 and 3, the corner step and the K<sub>S<sub>To</sub></sub> scale.
    CornerTemperatures = 0x243F,

    /// One word per pixel, row-major: offset, α, K<sub>Ta</sub> and the outlier flag.
    Pixels = 0x2440,
}

impl EepromAddress {
    /// The index of this word within a full EEPROM dump.
    pub(crate) fn word_index(self) -> usize {
        usize::from(u16::from(self) - u16::from(Self::Base))
    }
}

impl From<EepromAddress> for Address {
    fn from(eeprom_address: EepromAddress) -> Self {
        Address::new(eeprom_address.into())
    }
}

/// RAM addresses. Pixels start at `Base`, the rest are the auxiliary measurements.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive)]
#[repr(u16)]
pub(crate) enum RamAddress {
    Base = 0x0400,

    /// V<sub>BE</sub>, for the ambient temperature.
    Vbe = 0x0700,

    CompensationPixelZero = 0x0708,

    /// The gain measured this frame, not the calibration value.
    Gain = 0x070A,

    /// V<sub>PTAT</sub> (T<sub>a<sub>PTAT</sub></sub> in the memory map).
    VPtat = 0x0720,

    CompensationPixelOne = 0x0728,

    /// The pixel supply voltage, V<sub>DD<sub>pix</sub></sub>.
    Vdd = 0x072A,
}

impl RamAddress {
    /// The index of this word within a [`RawFrame`][crate::frame::RawFrame].
    pub(crate) fn word_index(self) -> usize {
        usize::from(u16::from(self) - u16::from(Self::Base))
    }
}

impl From<RamAddress> for Address {
    fn from(ram_address: RamAddress) -> Self {
        Address::new(ram_address.into())
    }
}
