// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Decoding the calibration constants stored in the camera's EEPROM.
//!
//! The EEPROM is 832 words. The first 64 are shared constants, packed into fields from 3 to 16
//! bits wide, and the remaining 768 are one word per pixel. The per-pixel sensitivity, offset and
//! K<sub>T<sub>a</sub></sub> values are built up from row and column averages with a small
//! per-pixel remainder added on top.
mod defects;
mod fixed_point;

use embedded_hal::blocking::i2c;
use num_traits::Float;

use crate::address::EepromAddress;
use crate::bus::read_words_chunked;
use crate::common::{
    alpha_correction_coefficients, FromI2C, HEIGHT, NUM_PIXELS, NUM_RANGES, NUM_WORDS, WIDTH,
};
use crate::error::{Error, LibraryError};
use crate::expose_member;
use crate::register::{AccessPattern, Subpage};
use crate::util::{is_bit_set, signed_field, unsigned_field};

pub use defects::PixelDefects;
pub use fixed_point::{FixedPoint, ScaledTable};

/// The number of corner temperatures, including the fixed 400°C upper bound.
pub const NUM_CORNER_TEMPERATURES: usize = NUM_RANGES + 1;

/// The temperature range the sensitivity calibration was performed in (0°C to CT<sub>2</sub>).
const BASIC_TEMPERATURE_RANGE: usize = 1;

/// The EEPROM only has room for four K<sub>S<sub>T<sub>o</sub></sub></sub> values, the one past
/// the last corner temperature is fixed.
const K_S_TO_ABOVE_LAST_CORNER: f32 = -0.0002;

/// The row and column accumulation data for one of the per-pixel tables.
///
/// The offset and sensitivity tables share a 16-word layout: a word of scales, the average for
/// all pixels, 6 words of signed nibbles for the rows and 8 words for the columns.
struct PixelAccumulation {
    base: [i32; NUM_PIXELS],
    remainder_scale: u16,
    /// The top nibble of the scales word, which isn't part of the accumulation itself.
    extra: u16,
}

impl PixelAccumulation {
    const ROW_WORDS: usize = HEIGHT / 4;

    fn new(block: &[u16], average: i32) -> Self {
        let scales = block[0];
        let remainder_scale = unsigned_field(scales, 0, 4);
        let column_scale = unsigned_field(scales, 4, 4);
        let row_scale = unsigned_field(scales, 8, 4);
        let extra = unsigned_field(scales, 12, 4);
        let rows: [i32; HEIGHT] = unpack_nibbles(&block[2..(2 + Self::ROW_WORDS)]);
        let columns: [i32; WIDTH] = unpack_nibbles(&block[(2 + Self::ROW_WORDS)..]);
        let mut base = [average; NUM_PIXELS];
        for (row_index, row) in base.chunks_exact_mut(WIDTH).enumerate() {
            let row_term = rows[row_index] << row_scale;
            row.iter_mut()
                .zip(columns.iter())
                .for_each(|(element, column)| *element += row_term + (column << column_scale));
        }
        Self {
            base,
            remainder_scale,
            extra,
        }
    }
}

/// Expand signed nibbles into a table. The least significant nibble of each word comes first.
fn unpack_nibbles<const N: usize>(words: &[u16]) -> [i32; N] {
    let mut values = [0i32; N];
    for (index, value) in values.iter_mut().enumerate() {
        let shift = 4 * (index % 4) as u32;
        *value = i32::from(signed_field(words[index / 4], shift, 4));
    }
    values
}

/// Which of the four row/column parity combinations a pixel is.
///
/// 0 is an even row and even column, 1 an even row and odd column, 2 an odd row and even column
/// and 3 both odd (all 0-indexed).
fn parity_index(pixel_index: usize) -> usize {
    2 * ((pixel_index / WIDTH) % 2) + pixel_index % 2
}

fn exp2(exponent: u16) -> f32 {
    Float::powi(2f32, i32::from(exponent))
}

/// Calibration constants for an MLX90640, decoded from its EEPROM.
#[derive(Clone, Debug, PartialEq)]
pub struct Mlx90640Calibration {
    pub(crate) k_v_dd: i16,

    pub(crate) v_dd_25: i16,

    pub(crate) k_v_ptat: f32,

    pub(crate) k_t_ptat: f32,

    pub(crate) v_ptat_25: f32,

    pub(crate) alpha_ptat: f32,

    pub(crate) gain: f32,

    pub(crate) temperature_gradient_coefficient: f32,

    pub(crate) k_s_ta: f32,

    pub(crate) resolution: u8,

    pub(crate) calibration_pattern: AccessPattern,

    pub(crate) corner_temperatures: [i16; NUM_CORNER_TEMPERATURES],

    pub(crate) k_s_to: [f32; NUM_CORNER_TEMPERATURES],

    pub(crate) alpha_correction: [f32; NUM_RANGES],

    /// Stored as the reciprocal of the sensitivity, scaled by 10<sup>-6</sup>.
    pub(crate) alpha_pixels: ScaledTable<u16, NUM_PIXELS>,

    pub(crate) offset_pixels: [i16; NUM_PIXELS],

    pub(crate) k_ta_pixels: ScaledTable<i8, NUM_PIXELS>,

    pub(crate) k_v_pixels: ScaledTable<i8, NUM_PIXELS>,

    pub(crate) alpha_cp: [f32; 2],

    pub(crate) offset_cp: [i16; 2],

    pub(crate) k_ta_cp: f32,

    pub(crate) k_v_cp: f32,

    pub(crate) interlaced_chess_correction: [f32; 3],

    pub(crate) defects: PixelDefects,
}

impl Mlx90640Calibration {
    /// Decode a full EEPROM dump.
    ///
    /// `eeprom` must be exactly [`NUM_WORDS`] long. Fails if the defective pixels marked in the
    /// EEPROM make the camera unusable.
    pub fn from_words(eeprom: &[u16]) -> Result<Self, LibraryError> {
        if eeprom.len() != NUM_WORDS {
            return Err(LibraryError::InvalidData(
                "An EEPROM dump must be exactly 832 words",
            ));
        }
        let word = |address: EepromAddress| eeprom[address.word_index()];
        let pixel_words = &eeprom[EepromAddress::Pixels.word_index()..];
        let defects = match PixelDefects::scan(pixel_words) {
            Ok(defects) => defects,
            Err(defect) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Rejecting calibration data: {}", defect);
                return Err(defect.into());
            }
        };

        // Supply voltage
        let vdd_word = word(EepromAddress::Vdd);
        let k_v_dd = signed_field(vdd_word, 8, 8) * 32;
        let v_dd_25 = (unsigned_field(vdd_word, 0, 8) as i16 - 256) * 32 - 8192;

        // Ambient temperature
        let ptat_word = word(EepromAddress::KPtat);
        let k_v_ptat = f32::from(signed_field(ptat_word, 10, 6)) / 4096.0;
        let k_t_ptat = f32::from(signed_field(ptat_word, 0, 10)) / 8.0;
        let v_ptat_25 = f32::from(word(EepromAddress::VPtat25));
        let offset_block_start = EepromAddress::OffsetScales.word_index();
        let offset_block = &eeprom[offset_block_start..(offset_block_start + 16)];
        let offset_accumulation = PixelAccumulation::new(
            offset_block,
            i32::from(word(EepromAddress::OffsetAverage) as i16),
        );
        let alpha_ptat = f32::from(offset_accumulation.extra) / 4.0 + 8.0;

        let gain = f32::from(word(EepromAddress::Gain) as i16);
        let sensitivity_word = word(EepromAddress::KsTaTgc);
        let temperature_gradient_coefficient = f32::from(signed_field(sensitivity_word, 0, 8)) / 32.0;
        let k_s_ta = f32::from(signed_field(sensitivity_word, 8, 8)) / 8192.0;

        let scales_word = word(EepromAddress::KvKtaScales);
        let resolution = unsigned_field(scales_word, 12, 2) as u8;
        let k_v_scale = unsigned_field(scales_word, 8, 4);
        let k_ta_scale1 = unsigned_field(scales_word, 4, 4) + 8;
        let k_ta_scale2 = unsigned_field(scales_word, 0, 4);

        // Bit 11 is cleared for cameras calibrated with the chess pattern.
        let calibration_pattern = if is_bit_set(word(EepromAddress::CalibrationPattern), 11) {
            AccessPattern::Interleave
        } else {
            AccessPattern::Chess
        };
        let interlaced_word = word(EepromAddress::InterlacedCorrection);
        let interlaced_chess_correction = [
            f32::from(signed_field(interlaced_word, 0, 6)) / 16.0,
            f32::from(signed_field(interlaced_word, 6, 5)) / 2.0,
            f32::from(signed_field(interlaced_word, 11, 5)) / 8.0,
        ];

        // Temperature ranges
        let corners_word = word(EepromAddress::CornerTemperatures);
        let corner_step = unsigned_field(corners_word, 12, 2) as i16 * 10;
        let ct2 = unsigned_field(corners_word, 4, 4) as i16 * corner_step;
        let ct3 = ct2 + unsigned_field(corners_word, 8, 4) as i16 * corner_step;
        let corner_temperatures = [-40, 0, ct2, ct3, 400];
        let k_s_to_scale = exp2(unsigned_field(corners_word, 0, 4) + 8);
        let low_ranges = word(EepromAddress::KsToLow);
        let high_ranges = word(EepromAddress::KsToHigh);
        let k_s_to = [
            f32::from(signed_field(low_ranges, 0, 8)) / k_s_to_scale,
            f32::from(signed_field(low_ranges, 8, 8)) / k_s_to_scale,
            f32::from(signed_field(high_ranges, 0, 8)) / k_s_to_scale,
            f32::from(signed_field(high_ranges, 8, 8)) / k_s_to_scale,
            K_S_TO_ABOVE_LAST_CORNER,
        ];
        let alpha_correction =
            alpha_correction_coefficients(BASIC_TEMPERATURE_RANGE, &corner_temperatures, &k_s_to);

        // Compensation pixels
        let alpha_block_start = EepromAddress::AlphaScales.word_index();
        let alpha_block = &eeprom[alpha_block_start..(alpha_block_start + 16)];
        let alpha_accumulation = PixelAccumulation::new(
            alpha_block,
            i32::from(word(EepromAddress::AlphaReference)),
        );
        // The compensation pixels add 27 to the stored exponent, the other pixels add 30.
        let alpha_scale_cp = alpha_accumulation.extra + 27;
        let cp_sensitivity = word(EepromAddress::CpAlpha);
        let alpha_cp0 = f32::from(signed_field(cp_sensitivity, 0, 10)) / exp2(alpha_scale_cp);
        let alpha_cp_ratio = f32::from(signed_field(cp_sensitivity, 10, 6)) / 128.0;
        let alpha_cp = [alpha_cp0, (1.0 + alpha_cp_ratio) * alpha_cp0];
        let cp_offset_word = word(EepromAddress::CpOffset);
        let offset_cp0 = signed_field(cp_offset_word, 0, 10);
        let offset_cp = [offset_cp0, offset_cp0 + signed_field(cp_offset_word, 10, 6)];
        let cp_constants = word(EepromAddress::CpKvKta);
        let k_ta_cp = f32::from(signed_field(cp_constants, 0, 8)) / exp2(k_ta_scale1);
        let k_v_cp = f32::from(signed_field(cp_constants, 8, 8)) / exp2(k_v_scale);

        // Per-pixel sensitivity
        let alpha_scale_pixels = alpha_accumulation.extra + 30;
        let cp_gradient =
            temperature_gradient_coefficient * (alpha_cp[0] + alpha_cp[1]) / 2.0;
        let alpha_pixels = {
            let mut reciprocal_alpha = [0f32; NUM_PIXELS];
            for (index, value) in reciprocal_alpha.iter_mut().enumerate() {
                let remainder = i32::from(signed_field(pixel_words[index], 4, 6))
                    << alpha_accumulation.remainder_scale;
                let alpha = (alpha_accumulation.base[index] + remainder) as f32
                    / exp2(alpha_scale_pixels)
                    - cp_gradient;
                *value = 1e-6 / alpha;
            }
            ScaledTable::quantize(&reciprocal_alpha)
        };

        // Per-pixel offset
        let mut offset_pixels = [0i16; NUM_PIXELS];
        for (index, offset) in offset_pixels.iter_mut().enumerate() {
            let remainder = i32::from(signed_field(pixel_words[index], 10, 6))
                << offset_accumulation.remainder_scale;
            // Offsets are 16-bit on the camera, and wrap the same way.
            *offset = (offset_accumulation.base[index] + remainder) as i16;
        }

        // Per-pixel K_Ta, with the average chosen by row and column parity.
        let k_ta_even_columns = word(EepromAddress::KtaAveragesEvenColumns);
        let k_ta_odd_columns = word(EepromAddress::KtaAveragesOddColumns);
        let k_ta_averages = [
            signed_field(k_ta_even_columns, 8, 8),
            signed_field(k_ta_odd_columns, 8, 8),
            signed_field(k_ta_even_columns, 0, 8),
            signed_field(k_ta_odd_columns, 0, 8),
        ];
        let k_ta_pixels = {
            let mut k_ta = [0f32; NUM_PIXELS];
            for (index, value) in k_ta.iter_mut().enumerate() {
                // The remainder scale goes up to 15, so the sum needs more than 16 bits.
                let remainder = i32::from(signed_field(pixel_words[index], 1, 3)) << k_ta_scale2;
                let numerator = remainder + i32::from(k_ta_averages[parity_index(index)]);
                *value = numerator as f32 / exp2(k_ta_scale1);
            }
            ScaledTable::quantize(&k_ta)
        };

        // Per-pixel K_V only depends on parity.
        let k_v_word = word(EepromAddress::KvAverages);
        let k_v_averages = [
            signed_field(k_v_word, 12, 4),
            signed_field(k_v_word, 4, 4),
            signed_field(k_v_word, 8, 4),
            signed_field(k_v_word, 0, 4),
        ];
        let k_v_pixels = {
            let mut k_v = [0f32; NUM_PIXELS];
            for (index, value) in k_v.iter_mut().enumerate() {
                *value = f32::from(k_v_averages[parity_index(index)]) / exp2(k_v_scale);
            }
            ScaledTable::quantize(&k_v)
        };

        Ok(Self {
            k_v_dd,
            v_dd_25,
            k_v_ptat,
            k_t_ptat,
            v_ptat_25,
            alpha_ptat,
            gain,
            temperature_gradient_coefficient,
            k_s_ta,
            resolution,
            calibration_pattern,
            corner_temperatures,
            k_s_to,
            alpha_correction,
            alpha_pixels,
            offset_pixels,
            k_ta_pixels,
            k_v_pixels,
            alpha_cp,
            offset_cp,
            k_ta_cp,
            k_v_cp,
            interlaced_chess_correction,
            defects,
        })
    }

    expose_member!(
        /// K<sub>V<sub>DD</sub></sub>, already multiplied by 2<sup>5</sup>.
        k_v_dd,
        i16
    );
    expose_member!(v_dd_25, i16);
    expose_member!(k_v_ptat, f32);
    expose_member!(k_t_ptat, f32);
    expose_member!(v_ptat_25, f32);
    expose_member!(alpha_ptat, f32);
    expose_member!(
        /// The gain at calibration time.
        gain,
        f32
    );
    expose_member!(temperature_gradient_coefficient, f32);
    expose_member!(k_s_ta, f32);
    expose_member!(
        /// The ADC resolution the camera was calibrated at, as the raw 2-bit value.
        resolution,
        u8
    );
    expose_member!(
        /// The access pattern the camera was calibrated with.
        calibration_pattern,
        AccessPattern
    );
    expose_member!(&corner_temperatures, [i16; NUM_CORNER_TEMPERATURES]);
    expose_member!(&k_s_to, [f32; NUM_CORNER_TEMPERATURES]);
    expose_member!(&alpha_correction, [f32; NUM_RANGES]);
    expose_member!(
        /// 10<sup>-6</sup> divided by each pixel's sensitivity.
        &alpha_pixels,
        ScaledTable<u16, NUM_PIXELS>
    );
    expose_member!(&offset_pixels, [i16; NUM_PIXELS]);
    expose_member!(&k_ta_pixels, ScaledTable<i8, NUM_PIXELS>);
    expose_member!(&k_v_pixels, ScaledTable<i8, NUM_PIXELS>);
    expose_member!(k_ta_cp, f32);
    expose_member!(k_v_cp, f32);
    expose_member!(
        /// The corrections applied when the live access pattern differs from
        /// [`calibration_pattern`][Self::calibration_pattern].
        &interlaced_chess_correction,
        [f32; 3]
    );
    expose_member!(&defects, PixelDefects);

    pub fn alpha_cp(&self, subpage: Subpage) -> f32 {
        self.alpha_cp[subpage as usize]
    }

    pub fn offset_cp(&self, subpage: Subpage) -> i16 {
        self.offset_cp[subpage as usize]
    }
}

impl<I2C> FromI2C<I2C> for Mlx90640Calibration
where
    I2C: i2c::WriteRead + i2c::Write,
{
    type Error = Error<I2C>;
    type Ok = Self;

    fn from_i2c(bus: &mut I2C, i2c_address: u8) -> Result<Self, Error<I2C>> {
        let mut eeprom = [0u16; NUM_WORDS];
        read_words_chunked(bus, i2c_address, EepromAddress::Base.into(), &mut eeprom)?;
        Ok(Self::from_words(&eeprom)?)
    }
}
