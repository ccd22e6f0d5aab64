// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Turning a raw frame into temperatures.
//!
//! The steps follow the "Calculating the object temperature" section of the datasheet. Values
//! common to every pixel (supply voltage, ambient temperature, gain and the compensation pixel)
//! are worked out once per pass, then each pixel of the active subpage is solved for its object
//! temperature twice: once with the basic range's constants, then again with the constants for
//! the range that first estimate falls in.
use num_traits::Float;

use crate::address::RamAddress;
use crate::calibration::Mlx90640Calibration;
use crate::common::{conversion_pattern, interleave_pattern, pixel_subpage, NUM_PIXELS, NUM_RANGES};
use crate::frame::RawFrame;
use crate::register::{AccessPattern, Resolution, Subpage};

/// Constant needed a few times for the final pixel temperature calculations.
const KELVINS_TO_CELSIUS: f32 = 273.15;

/// The supply voltage the camera was calibrated at.
const V_DD_0: f32 = 3.3;

/// The ambient temperature the camera was calibrated at.
const T_A_0: f32 = 25.0;

/// Without a separate sensor, the reflected temperature is assumed to be this much below ambient.
const REFLECTED_TEMPERATURE_OFFSET: f32 = 8.0;

pub const EMISSIVITY: f32 = 0.95;

/// The range the first object temperature estimate is made in.
const BASIC_RANGE: usize = 1;

fn fourth_root(value: f32) -> f32 {
    Float::sqrt(Float::sqrt(value))
}

/// The ratio between the calibration ADC resolution and the live one.
pub fn resolution_correction(calibration_resolution: u8, resolution: Resolution) -> f32 {
    Float::powi(2f32, i32::from(calibration_resolution))
        / Float::powi(2f32, i32::from(resolution.as_raw()))
}

/// The pixel supply voltage, in volts.
pub fn supply_voltage(
    calibration: &Mlx90640Calibration,
    raw: &RawFrame,
    resolution_correction: f32,
) -> f32 {
    let v_dd_pixel = f32::from(raw.auxiliary(RamAddress::Vdd));
    (resolution_correction * v_dd_pixel - f32::from(calibration.v_dd_25))
        / f32::from(calibration.k_v_dd)
        + V_DD_0
}

/// The ambient temperature (the sensor's own temperature), in °C.
pub fn ambient_temperature(calibration: &Mlx90640Calibration, raw: &RawFrame, v_dd: f32) -> f32 {
    // Labelled V_PTAT in the formulas, but T_a_PTAT in the memory map.
    let v_ptat = f32::from(raw.auxiliary(RamAddress::VPtat));
    let v_be = f32::from(raw.auxiliary(RamAddress::Vbe));
    let v_ptat_art = v_ptat / (v_ptat * calibration.alpha_ptat + v_be) * Float::powi(2f32, 18);
    let numerator = v_ptat_art / (1.0 + calibration.k_v_ptat * (v_dd - V_DD_0)) - calibration.v_ptat_25;
    numerator / calibration.k_t_ptat + T_A_0
}

/// Which temperature range an object temperature falls in.
///
/// A temperature equal to a corner temperature is in the range above it.
pub fn temperature_range(corner_temperatures: &[i16], temperature: f32) -> usize {
    if temperature < f32::from(corner_temperatures[1]) {
        0
    } else if temperature < f32::from(corner_temperatures[2]) {
        1
    } else if temperature < f32::from(corner_temperatures[3]) {
        2
    } else {
        NUM_RANGES - 1
    }
}

/// T<sub>a-r</sub>, the combined ambient and reflected radiation term.
fn t_ar(t_a: f32, t_r: f32, emissivity: f32) -> f32 {
    let t_a_k4 = Float::powi(t_a + KELVINS_TO_CELSIUS, 4);
    let t_r_k4 = Float::powi(t_r + KELVINS_TO_CELSIUS, 4);
    t_r_k4 - (t_r_k4 - t_a_k4) / emissivity
}

/// Values that are shared by every pixel in one compensation pass.
#[derive(Clone, Debug, PartialEq)]
struct CommonIrData {
    gain: f32,
    delta_t_a: f32,
    delta_v: f32,
    t_ar: f32,
    /// The live access pattern doesn't match the calibration one.
    pattern_mismatch: bool,
    /// The compensation pixel signal for the active subpage, already multiplied by TGC.
    compensation_pixel: f32,
    /// 1 + K<sub>S<sub>T<sub>a</sub></sub></sub>(T<sub>a</sub> - T<sub>a<sub>0</sub></sub>)
    alpha_coefficient: f32,
}

impl CommonIrData {
    fn new(
        calibration: &Mlx90640Calibration,
        raw: &RawFrame,
        subpage: Subpage,
        access_pattern: AccessPattern,
        t_a: f32,
        v_dd: f32,
    ) -> Self {
        let delta_t_a = t_a - T_A_0;
        let delta_v = v_dd - V_DD_0;
        let t_r = t_a - REFLECTED_TEMPERATURE_OFFSET;
        let gain = calibration.gain / f32::from(raw.auxiliary(RamAddress::Gain));
        let pattern_mismatch = access_pattern != calibration.calibration_pattern;
        let cp_factor =
            (1.0 + calibration.k_ta_cp * delta_t_a) * (1.0 + calibration.k_v_cp * delta_v);
        let mut cp_offset = f32::from(calibration.offset_cp(subpage));
        if subpage == Subpage::One && pattern_mismatch {
            cp_offset += calibration.interlaced_chess_correction[0];
        }
        let compensation_pixel =
            f32::from(raw.compensation_pixel(subpage)) * gain - cp_offset * cp_factor;
        Self {
            gain,
            delta_t_a,
            delta_v,
            t_ar: t_ar(t_a, t_r, EMISSIVITY),
            pattern_mismatch,
            compensation_pixel: calibration.temperature_gradient_coefficient * compensation_pixel,
            alpha_coefficient: 1.0 + calibration.k_s_ta * delta_t_a,
        }
    }
}

/// The infrared signal for one pixel, compensated for offset, gradient and emissivity.
fn pixel_v_ir(
    calibration: &Mlx90640Calibration,
    common: &CommonIrData,
    raw: &RawFrame,
    pixel_index: usize,
) -> f32 {
    let k_ta = calibration.k_ta_pixels.get(pixel_index);
    let k_v = calibration.k_v_pixels.get(pixel_index);
    let offset = f32::from(calibration.offset_pixels[pixel_index]);
    let mut v_ir = f32::from(raw.pixel(pixel_index)) * common.gain
        - offset * (1.0 + k_ta * common.delta_t_a) * (1.0 + k_v * common.delta_v);
    if common.pattern_mismatch {
        let pattern = &calibration.interlaced_chess_correction;
        let interleave = interleave_pattern(pixel_index) as usize as f32;
        let conversion = f32::from(conversion_pattern(pixel_index));
        v_ir += pattern[2] * (2.0 * interleave - 1.0) - pattern[1] * conversion;
    }
    (v_ir - common.compensation_pixel) / EMISSIVITY
}

/// Solve for the object temperature of one pixel.
fn pixel_temperature(
    calibration: &Mlx90640Calibration,
    common: &CommonIrData,
    v_ir: f32,
    pixel_index: usize,
) -> f32 {
    let alpha_scale = Float::powi(2f32, i32::from(calibration.alpha_pixels.scale()));
    let alpha = 1e-6 * alpha_scale / f32::from(calibration.alpha_pixels.raw(pixel_index))
        * common.alpha_coefficient;
    let k_s_to = &calibration.k_s_to;
    let ct = &calibration.corner_temperatures;

    let s_x = k_s_to[BASIC_RANGE]
        * fourth_root(Float::powi(alpha, 3) * (v_ir + alpha * common.t_ar));
    let estimate = fourth_root(
        v_ir / (alpha * (1.0 - k_s_to[BASIC_RANGE] * KELVINS_TO_CELSIUS) + s_x) + common.t_ar,
    ) - KELVINS_TO_CELSIUS;

    let range = temperature_range(ct, estimate);
    let range_alpha = alpha
        * calibration.alpha_correction[range]
        * (1.0 + k_s_to[range] * (estimate - f32::from(ct[range])));
    fourth_root(v_ir / range_alpha + common.t_ar) - KELVINS_TO_CELSIUS
}

/// Compute the temperatures for the pixels of one subpage.
///
/// Only the pixels belonging to `subpage` (under `access_pattern`) are written to `destination`.
/// The ambient temperature is returned.
pub fn compensate(
    calibration: &Mlx90640Calibration,
    raw: &RawFrame,
    subpage: Subpage,
    access_pattern: AccessPattern,
    resolution: Resolution,
    destination: &mut [f32; NUM_PIXELS],
) -> f32 {
    let resolution_correction = resolution_correction(calibration.resolution, resolution);
    let v_dd = supply_voltage(calibration, raw, resolution_correction);
    let t_a = ambient_temperature(calibration, raw, v_dd);
    let common = CommonIrData::new(calibration, raw, subpage, access_pattern, t_a, v_dd);
    destination
        .iter_mut()
        .enumerate()
        .filter(|(pixel_index, _)| pixel_subpage(*pixel_index, access_pattern) == subpage)
        .for_each(|(pixel_index, output)| {
            let v_ir = pixel_v_ir(calibration, &common, raw, pixel_index);
            *output = pixel_temperature(calibration, &common, v_ir, pixel_index);
        });
    t_a
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;
    use mlx90640_cycle_test_data::datasheet_ram;

    use crate::calibration::test::{datasheet_calibration, DATASHEET_PIXEL};
    use crate::calibration::ScaledTable;
    use crate::common::{pixel_subpage, NUM_PIXELS, WIDTH};
    use crate::frame::RawFrame;
    use crate::register::{AccessPattern, Resolution, Subpage};

    fn datasheet_frame() -> RawFrame {
        RawFrame::from(datasheet_ram())
    }

    #[test]
    fn resolution_correction() {
        assert_eq!(super::resolution_correction(2, Resolution::Eighteen), 1.0);
        assert_eq!(super::resolution_correction(2, Resolution::Nineteen), 0.5);
        assert_eq!(super::resolution_correction(2, Resolution::Sixteen), 4.0);
    }

    #[test]
    fn supply_voltage() {
        let calibration = datasheet_calibration();
        let frame = datasheet_frame();
        // Datasheet has ≈3.319
        assert_approx_eq!(
            f32,
            super::supply_voltage(&calibration, &frame, 1.0),
            3.3186237,
            epsilon = 1e-4
        );
        assert_approx_eq!(
            f32,
            super::supply_voltage(&calibration, &frame, 0.5),
            1.2487058,
            epsilon = 1e-4
        );
    }

    #[test]
    fn ambient_temperature() {
        let calibration = datasheet_calibration();
        let frame = datasheet_frame();
        let v_dd = super::supply_voltage(&calibration, &frame, 1.0);
        // Datasheet has ≈39.184
        let t_a = super::ambient_temperature(&calibration, &frame, v_dd);
        assert_approx_eq!(f32, t_a, 39.184424, epsilon = 1e-3);
        // Nothing is cached between calls.
        assert_eq!(super::ambient_temperature(&calibration, &frame, v_dd), t_a);
    }

    #[test]
    fn temperature_range_boundaries() {
        let ct = [-40, 0, 160, 320, 400];
        assert_eq!(super::temperature_range(&ct, -40.0), 0);
        assert_eq!(super::temperature_range(&ct, -0.001), 0);
        assert_eq!(super::temperature_range(&ct, 0.0), 1);
        assert_eq!(super::temperature_range(&ct, 159.99), 1);
        assert_eq!(super::temperature_range(&ct, 160.0), 2);
        assert_eq!(super::temperature_range(&ct, 320.0), 3);
        assert_eq!(super::temperature_range(&ct, 1000.0), 3);
    }

    #[test]
    fn datasheet_chess_subpage_zero() {
        let calibration = datasheet_calibration();
        let mut temperatures = [f32::NAN; NUM_PIXELS];
        let t_a = super::compensate(
            &calibration,
            &datasheet_frame(),
            Subpage::Zero,
            AccessPattern::Chess,
            Resolution::Eighteen,
            &mut temperatures,
        );
        assert_approx_eq!(f32, t_a, 39.184424, epsilon = 1e-3);
        assert_approx_eq!(f32, temperatures[DATASHEET_PIXEL], 82.32293, epsilon = 0.01);
        assert_approx_eq!(f32, temperatures[0], 129.51417, epsilon = 0.01);
        assert_approx_eq!(f32, temperatures[WIDTH + 1], 120.57742, epsilon = 0.01);
        // Subpage 1 pixels are left alone.
        assert!(temperatures[1].is_nan());
        assert!(temperatures[WIDTH].is_nan());
    }

    #[test]
    fn datasheet_chess_subpage_one() {
        let calibration = datasheet_calibration();
        let mut temperatures = [f32::NAN; NUM_PIXELS];
        super::compensate(
            &calibration,
            &datasheet_frame(),
            Subpage::One,
            AccessPattern::Chess,
            Resolution::Eighteen,
            &mut temperatures,
        );
        assert_approx_eq!(f32, temperatures[1], 119.76131, epsilon = 0.01);
        assert_approx_eq!(f32, temperatures[WIDTH], 130.27136, epsilon = 0.01);
        assert!(temperatures[0].is_nan());
        assert!(temperatures[DATASHEET_PIXEL].is_nan());
    }

    #[test]
    fn mismatched_pattern_is_corrected() {
        // The datasheet camera was calibrated with the chess pattern.
        let calibration = datasheet_calibration();
        let mut temperatures = [f32::NAN; NUM_PIXELS];
        super::compensate(
            &calibration,
            &datasheet_frame(),
            Subpage::Zero,
            AccessPattern::Interleave,
            Resolution::Eighteen,
            &mut temperatures,
        );
        let expected = [129.50133, 120.04284, 112.11750, 112.13833];
        for (actual, expected) in temperatures.iter().zip(expected.iter()) {
            assert_approx_eq!(f32, *actual, *expected, epsilon = 0.01);
        }
        // The whole first row is subpage 0 when interleaved, the second row isn't.
        assert!(temperatures[..WIDTH].iter().all(|t| !t.is_nan()));
        assert!(temperatures[WIDTH..(2 * WIDTH)].iter().all(|t| t.is_nan()));
    }

    #[test]
    fn higher_resolution() {
        let calibration = datasheet_calibration();
        let mut temperatures = [f32::NAN; NUM_PIXELS];
        let t_a = super::compensate(
            &calibration,
            &datasheet_frame(),
            Subpage::Zero,
            AccessPattern::Chess,
            Resolution::Nineteen,
            &mut temperatures,
        );
        assert_approx_eq!(f32, t_a, 42.609392, epsilon = 1e-3);
        assert_approx_eq!(f32, temperatures[0], 131.3122, epsilon = 0.01);
    }

    #[test]
    fn subpages_fill_every_pixel_once() {
        let calibration = datasheet_calibration();
        let frame = datasheet_frame();
        for pattern in [AccessPattern::Chess, AccessPattern::Interleave] {
            let mut temperatures = [f32::NAN; NUM_PIXELS];
            super::compensate(
                &calibration,
                &frame,
                Subpage::Zero,
                pattern,
                Resolution::Eighteen,
                &mut temperatures,
            );
            let after_zero = temperatures;
            super::compensate(
                &calibration,
                &frame,
                Subpage::One,
                pattern,
                Resolution::Eighteen,
                &mut temperatures,
            );
            for index in 0..NUM_PIXELS {
                assert!(!temperatures[index].is_nan());
                if pixel_subpage(index, pattern) == Subpage::Zero {
                    // Untouched by the subpage 1 pass
                    assert_eq!(temperatures[index].to_bits(), after_zero[index].to_bits());
                } else {
                    assert!(after_zero[index].is_nan());
                }
            }
        }
    }

    #[test]
    fn no_signal_is_reflected_baseline() {
        let mut calibration = datasheet_calibration();
        calibration.offset_pixels = [0; NUM_PIXELS];
        calibration.k_ta_pixels = ScaledTable::quantize(&[0.0; NUM_PIXELS]);
        calibration.k_v_pixels = ScaledTable::quantize(&[0.0; NUM_PIXELS]);
        calibration.temperature_gradient_coefficient = 0.0;
        let mut words = datasheet_ram();
        words[..NUM_PIXELS].iter_mut().for_each(|word| *word = 0);
        let frame = RawFrame::from(words);
        let mut temperatures = [f32::NAN; NUM_PIXELS];
        let t_a = super::compensate(
            &calibration,
            &frame,
            Subpage::Zero,
            AccessPattern::Chess,
            Resolution::Eighteen,
            &mut temperatures,
        );
        let baseline = super::t_ar(t_a, t_a - 8.0, super::EMISSIVITY).powf(0.25) - 273.15;
        for (index, temperature) in temperatures.iter().enumerate() {
            if pixel_subpage(index, AccessPattern::Chess) == Subpage::Zero {
                assert_approx_eq!(f32, *temperature, baseline, epsilon = 1e-3);
            }
        }
    }
}
