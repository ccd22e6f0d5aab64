// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Raw and compensated frame storage.
use core::ops::Range;

use crate::address::RamAddress;
use crate::common::{NUM_PIXELS, NUM_WORDS, WIDTH};
use crate::register::Subpage;

/// The number of 32-word rows in the RAM window.
pub const NUM_ROWS: usize = NUM_WORDS / WIDTH;

/// A copy of the camera's RAM window: the pixels, followed by two rows of auxiliary measurements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    words: [u16; NUM_WORDS],
}

impl RawFrame {
    pub fn new(words: [u16; NUM_WORDS]) -> Self {
        Self { words }
    }

    /// The word range within the frame covered by row `row`.
    fn row_range(row: usize) -> Range<usize> {
        (row * WIDTH)..((row + 1) * WIDTH)
    }

    /// The storage for one 32-word row, for filling from the bus.
    ///
    /// # Panics
    /// If `row` is not less than [`NUM_ROWS`].
    pub fn row_mut(&mut self, row: usize) -> &mut [u16] {
        &mut self.words[Self::row_range(row)]
    }

    pub fn row(&self, row: usize) -> &[u16] {
        &self.words[Self::row_range(row)]
    }

    pub fn words(&self) -> &[u16; NUM_WORDS] {
        &self.words
    }

    /// A pixel's raw ADC reading.
    pub fn pixel(&self, pixel_index: usize) -> i16 {
        self.words[pixel_index] as i16
    }

    pub(crate) fn auxiliary(&self, address: RamAddress) -> i16 {
        self.words[address.word_index()] as i16
    }

    pub(crate) fn compensation_pixel(&self, subpage: Subpage) -> i16 {
        match subpage {
            Subpage::Zero => self.auxiliary(RamAddress::CompensationPixelZero),
            Subpage::One => self.auxiliary(RamAddress::CompensationPixelOne),
        }
    }
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::new([0; NUM_WORDS])
    }
}

impl From<[u16; NUM_WORDS]> for RawFrame {
    fn from(words: [u16; NUM_WORDS]) -> Self {
        Self::new(words)
    }
}

/// The latest object temperatures (in °C) and the ambient temperature they were computed with.
///
/// Each compensation pass only writes the pixels of one subpage, the rest keep their value from
/// the previous pass. Pixels that haven't been computed yet are NaN.
#[derive(Clone, Debug)]
pub struct CompensatedFrame {
    pub(crate) temperatures: [f32; NUM_PIXELS],
    pub(crate) ambient_temperature: Option<f32>,
}

impl CompensatedFrame {
    pub fn temperatures(&self) -> &[f32; NUM_PIXELS] {
        &self.temperatures
    }

    /// `None` until the first compensation pass.
    pub fn ambient_temperature(&self) -> Option<f32> {
        self.ambient_temperature
    }
}

impl Default for CompensatedFrame {
    fn default() -> Self {
        Self {
            temperatures: [f32::NAN; NUM_PIXELS],
            ambient_temperature: None,
        }
    }
}
