// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use arrayvec::ArrayVec;

use crate::common::{NUM_PIXELS, WIDTH};
use crate::error::{DefectPairKind, PixelDefectError};

/// The most defective pixels of any kind a usable camera may have.
const MAX_DEFECTS: usize = 4;

/// Scanning stops once either list holds this many entries.
const SCAN_LIMIT: usize = MAX_DEFECTS + 1;

/// Broken and outlier pixels marked in the per-pixel calibration words.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelDefects {
    broken: ArrayVec<u16, SCAN_LIMIT>,
    outliers: ArrayVec<u16, SCAN_LIMIT>,
}

impl PixelDefects {
    /// Find the defective pixels, failing if there are too many or any of them are adjacent.
    ///
    /// `pixel_words` are the per-pixel calibration words in row-major order.
    pub fn scan(pixel_words: &[u16]) -> Result<Self, PixelDefectError> {
        let mut defects = Self::default();
        for (index, word) in pixel_words.iter().take(NUM_PIXELS).enumerate() {
            if defects.broken.is_full() || defects.outliers.is_full() {
                break;
            }
            if *word == 0 {
                defects.broken.push(index as u16);
            } else if word & 0x0001 != 0 {
                defects.outliers.push(index as u16);
            }
        }
        defects.check_counts()?;
        defects.check_adjacency()?;
        Ok(defects)
    }

    fn check_counts(&self) -> Result<(), PixelDefectError> {
        let broken = self.broken.len();
        let outliers = self.outliers.len();
        if broken > MAX_DEFECTS {
            Err(PixelDefectError::TooManyBroken { count: broken })
        } else if outliers > MAX_DEFECTS {
            Err(PixelDefectError::TooManyOutliers { count: outliers })
        } else if broken + outliers > MAX_DEFECTS {
            Err(PixelDefectError::TooManyDefects {
                count: broken + outliers,
            })
        } else {
            Ok(())
        }
    }

    fn check_adjacency(&self) -> Result<(), PixelDefectError> {
        check_pairs_within(&self.broken, DefectPairKind::BrokenBroken)?;
        check_pairs_within(&self.outliers, DefectPairKind::OutlierOutlier)?;
        for broken in self.broken.iter() {
            for outlier in self.outliers.iter() {
                if is_adjacent(*broken, *outlier) {
                    return Err(PixelDefectError::AdjacentDefects {
                        kind: DefectPairKind::BrokenOutlier,
                        first: *broken,
                        second: *outlier,
                    });
                }
            }
        }
        Ok(())
    }

    /// Indices of pixels with an all-zero calibration word.
    pub fn broken(&self) -> &[u16] {
        &self.broken
    }

    /// Indices of pixels flagged as outliers.
    pub fn outliers(&self) -> &[u16] {
        &self.outliers
    }

    pub fn is_empty(&self) -> bool {
        self.broken.is_empty() && self.outliers.is_empty()
    }
}

fn check_pairs_within(pixels: &[u16], kind: DefectPairKind) -> Result<(), PixelDefectError> {
    for (position, first) in pixels.iter().enumerate() {
        for second in pixels[(position + 1)..].iter() {
            if is_adjacent(*first, *second) {
                return Err(PixelDefectError::AdjacentDefects {
                    kind,
                    first: *first,
                    second: *second,
                });
            }
        }
    }
    Ok(())
}

/// Whether two pixels are neighbors on the grid (sharing a row, column or diagonal).
///
/// This only looks at the difference in linear index, so the last pixel of one row counts as
/// adjacent to the first pixel of the next.
pub(crate) fn is_adjacent(first: u16, second: u16) -> bool {
    let width = WIDTH as i32;
    let difference = i32::from(first) - i32::from(second);
    let magnitude = difference.abs();
    magnitude < 2 || (magnitude > width - 2 && magnitude < width + 2)
}

#[cfg(test)]
mod test {
    use crate::common::NUM_PIXELS;
    use crate::error::{DefectPairKind, PixelDefectError};

    use super::{is_adjacent, PixelDefects};

    const GOOD_WORD: u16 = 0x08A0;

    fn pixels_with(broken: &[usize], outliers: &[usize]) -> [u16; NUM_PIXELS] {
        let mut pixels = [GOOD_WORD; NUM_PIXELS];
        broken.iter().for_each(|index| pixels[*index] = 0);
        outliers
            .iter()
            .for_each(|index| pixels[*index] = GOOD_WORD | 0x0001);
        pixels
    }

    #[test]
    fn clean_pixels() {
        let defects = PixelDefects::scan(&pixels_with(&[], &[])).unwrap();
        assert!(defects.is_empty());
    }

    #[test]
    fn four_broken_allowed() {
        let pixels = pixels_with(&[10, 100, 300, 700], &[]);
        let defects = PixelDefects::scan(&pixels).unwrap();
        assert_eq!(defects.broken(), &[10, 100, 300, 700]);
        assert!(defects.outliers().is_empty());
    }

    #[test]
    fn five_broken_rejected() {
        let pixels = pixels_with(&[10, 100, 300, 500, 700], &[]);
        assert_eq!(
            PixelDefects::scan(&pixels),
            Err(PixelDefectError::TooManyBroken { count: 5 })
        );
    }

    #[test]
    fn five_outliers_rejected() {
        let pixels = pixels_with(&[], &[3, 50, 200, 400, 600, 767]);
        assert_eq!(
            PixelDefects::scan(&pixels),
            Err(PixelDefectError::TooManyOutliers { count: 5 })
        );
    }

    #[test]
    fn combined_count_rejected() {
        let pixels = pixels_with(&[10, 300, 700], &[100, 500]);
        assert_eq!(
            PixelDefects::scan(&pixels),
            Err(PixelDefectError::TooManyDefects { count: 5 })
        );
    }

    #[test]
    fn adjacency_bands() {
        let base = 200;
        for difference in [1, 31, 32, 33] {
            let pixels = pixels_with(&[base, base + difference], &[]);
            assert_eq!(
                PixelDefects::scan(&pixels),
                Err(PixelDefectError::AdjacentDefects {
                    kind: DefectPairKind::BrokenBroken,
                    first: base as u16,
                    second: (base + difference) as u16,
                }),
                "difference of {} should be adjacent",
                difference
            );
        }
        for difference in [2, 30, 34, 64] {
            let pixels = pixels_with(&[base, base + difference], &[]);
            assert!(
                PixelDefects::scan(&pixels).is_ok(),
                "difference of {} should not be adjacent",
                difference
            );
        }
    }

    #[test]
    fn adjacent_pair_kinds() {
        let pixels = pixels_with(&[], &[40, 72]);
        assert!(matches!(
            PixelDefects::scan(&pixels),
            Err(PixelDefectError::AdjacentDefects {
                kind: DefectPairKind::OutlierOutlier,
                ..
            })
        ));
        let pixels = pixels_with(&[40], &[73]);
        assert_eq!(
            PixelDefects::scan(&pixels),
            Err(PixelDefectError::AdjacentDefects {
                kind: DefectPairKind::BrokenOutlier,
                first: 40,
                second: 73,
            })
        );
    }

    #[test]
    fn adjacency_is_symmetric() {
        assert!(is_adjacent(33, 0));
        assert!(is_adjacent(0, 33));
        assert!(is_adjacent(5, 5));
        assert!(!is_adjacent(0, 34));
        assert!(!is_adjacent(34, 0));
    }
}
