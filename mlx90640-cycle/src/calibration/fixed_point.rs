// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Per-pixel tables stored as small integers sharing one power-of-two scale.
use num_traits::Float;

/// Integer types a [`ScaledTable`] can store.
pub trait FixedPoint: Copy + Default {
    /// Values are scaled up until the largest magnitude reaches this.
    const THRESHOLD: f32;

    /// Round to the nearest integer (ties away from zero), saturating at the type's bounds.
    fn from_rounded(value: f32) -> Self;

    fn to_f32(self) -> f32;
}

impl FixedPoint for i8 {
    const THRESHOLD: f32 = 64.0;

    fn from_rounded(value: f32) -> Self {
        // Float to int `as` casts saturate.
        Float::round(value) as i8
    }

    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl FixedPoint for u16 {
    const THRESHOLD: f32 = 32768.0;

    fn from_rounded(value: f32) -> Self {
        Float::round(value) as u16
    }

    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

/// A table of `N` values, each stored as `value * 2^scale`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaledTable<T, const N: usize> {
    values: [T; N],
    scale: u8,
}

impl<T: FixedPoint, const N: usize> ScaledTable<T, N> {
    /// Quantize a table of real values.
    ///
    /// The scale is the smallest exponent where the largest magnitude in `source`, multiplied by
    /// 2<sup>scale</sup>, is at least [`FixedPoint::THRESHOLD`]. A table of only zeros has a scale
    /// of 0.
    pub fn quantize(source: &[f32; N]) -> Self {
        let maximum = source
            .iter()
            .copied()
            .map(Float::abs)
            .fold(0f32, Float::max);
        let mut scale = 0u8;
        if maximum > 0.0 {
            let mut scaled_max = maximum;
            while scaled_max < T::THRESHOLD {
                scaled_max *= 2.0;
                scale += 1;
            }
        }
        let multiplier = Float::powi(2f32, i32::from(scale));
        let mut values = [T::default(); N];
        values
            .iter_mut()
            .zip(source.iter())
            .for_each(|(stored, real)| *stored = T::from_rounded(real * multiplier));
        Self { values, scale }
    }

    /// The shared exponent.
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// The stored integer for one entry.
    pub fn raw(&self, index: usize) -> T {
        self.values[index]
    }

    /// One entry, converted back to its real magnitude.
    pub fn get(&self, index: usize) -> f32 {
        self.values[index].to_f32() / Float::powi(2f32, i32::from(self.scale))
    }

    pub fn raw_values(&self) -> &[T; N] {
        &self.values
    }
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;

    use super::{FixedPoint, ScaledTable};

    #[test]
    fn rounding_ties_away_from_zero() {
        assert_eq!(i8::from_rounded(2.5), 3);
        assert_eq!(i8::from_rounded(-2.5), -3);
        assert_eq!(i8::from_rounded(-2.4), -2);
        assert_eq!(u16::from_rounded(0.5), 1);
    }

    #[test]
    fn rounding_saturates() {
        assert_eq!(i8::from_rounded(300.0), i8::MAX);
        assert_eq!(i8::from_rounded(-300.0), i8::MIN);
        assert_eq!(u16::from_rounded(70000.0), u16::MAX);
    }

    #[test]
    fn max_at_threshold_needs_no_scale() {
        let table = ScaledTable::<i8, 4>::quantize(&[64.0, 1.0, -3.0, 0.0]);
        assert_eq!(table.scale(), 0);
        assert_eq!(table.raw(0), 64);
        assert_eq!(table.raw(2), -3);
    }

    #[test]
    fn smallest_scale_is_chosen() {
        // Half the threshold needs exactly one doubling
        let table = ScaledTable::<i8, 2>::quantize(&[32.0, -1.0]);
        assert_eq!(table.scale(), 1);
        // Just under the threshold still needs one.
        let table = ScaledTable::<i8, 2>::quantize(&[63.9, 0.0]);
        assert_eq!(table.scale(), 1);
        // Negative values count by magnitude.
        let table = ScaledTable::<i8, 2>::quantize(&[0.5, -0.75]);
        assert_eq!(table.scale(), 7);
        assert_eq!(table.raw(1), -96);
    }

    #[test]
    fn values_recovered_within_one_step() {
        let source = [0.013_f32, -0.0041, 0.0097, 0.0003];
        let table = ScaledTable::<i8, 4>::quantize(&source);
        let step = 1.0 / 2f32.powi(i32::from(table.scale()));
        for (index, expected) in source.iter().enumerate() {
            assert!(
                (table.get(index) - expected).abs() <= step,
                "entry {} was {} instead of {}",
                index,
                table.get(index),
                expected
            );
        }
    }

    #[test]
    fn alpha_sized_values() {
        let source = [1.1e-7_f32, 2.3e-7, 1.7e-7];
        let table = ScaledTable::<u16, 3>::quantize(&source);
        assert!(table.raw(1) >= 32768);
        assert_approx_eq!(f32, table.get(1), 2.3e-7, epsilon = 1e-11);
    }

    #[test]
    fn zero_table() {
        let table = ScaledTable::<i8, 3>::quantize(&[0.0; 3]);
        assert_eq!(table.scale(), 0);
        assert_eq!(table.raw_values(), &[0, 0, 0]);
        assert_eq!(table.get(2), 0.0);
    }
}
