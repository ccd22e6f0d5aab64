// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

use embedded_hal::blocking::i2c;

/// Which two classes of defective pixel were found next to each other.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DefectPairKind {
    BrokenBroken,
    OutlierOutlier,
    BrokenOutlier,
}

/// Reasons the defective pixel layout stored in EEPROM makes the calibration unusable.
///
/// The camera marks a pixel as "broken" by storing an all-zero calibration word for it, and as an
/// "outlier" by setting the least significant bit of its calibration word. A handful of these are
/// tolerated, but only if none of them are next to each other.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelDefectError {
    /// More than four broken pixels.
    TooManyBroken { count: usize },

    /// More than four outlier pixels.
    TooManyOutliers { count: usize },

    /// More than four broken and outlier pixels combined.
    TooManyDefects { count: usize },

    /// Two defective pixels are neighbors (in the same row, column or diagonal).
    AdjacentDefects {
        kind: DefectPairKind,
        first: u16,
        second: u16,
    },
}

impl fmt::Display for PixelDefectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelDefectError::TooManyBroken { count } => {
                write!(f, "too many broken pixels ({})", count)
            }
            PixelDefectError::TooManyOutliers { count } => {
                write!(f, "too many outlier pixels ({})", count)
            }
            PixelDefectError::TooManyDefects { count } => {
                write!(f, "too many broken and outlier pixels ({})", count)
            }
            PixelDefectError::AdjacentDefects {
                kind,
                first,
                second,
            } => {
                let description = match kind {
                    DefectPairKind::BrokenBroken => "broken pixel has an adjacent broken pixel",
                    DefectPairKind::OutlierOutlier => "outlier pixel has an adjacent outlier pixel",
                    DefectPairKind::BrokenOutlier => "broken pixel has an adjacent outlier pixel",
                };
                write!(f, "{} ({} and {})", description, first, second)
            }
        }
    }
}

/// Errors that don't involve I²C.
#[derive(Clone, Debug, PartialEq)]
pub enum LibraryError {
    /// When a value from the camera is malformed in some way.
    InvalidData(&'static str),

    /// A single bus transaction was asked to move more words than the camera allows.
    TransferTooLong { requested: usize, maximum: usize },

    /// The calibration data describes an unusable pattern of defective pixels.
    Defect(PixelDefectError),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::InvalidData(msg) => write!(f, "{}", msg),
            LibraryError::TransferTooLong { requested, maximum } => write!(
                f,
                "transfer of {} words exceeds the limit of {} words",
                requested, maximum
            ),
            LibraryError::Defect(defect) => write!(f, "{}", defect),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LibraryError {}

impl From<PixelDefectError> for LibraryError {
    fn from(defect: PixelDefectError) -> Self {
        Self::Defect(defect)
    }
}

pub enum Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    /// Errors from the combined write-read I²C transactions used for every read.
    I2cWriteReadError(<I2C as i2c::WriteRead>::Error),

    /// Errors from plain I²C writes, used when updating registers.
    I2cWriteError(<I2C as i2c::Write>::Error),

    /// Errors originating from within this library.
    LibraryError(LibraryError),
}

// Custom Debug implementation so that I2C doesn't need to implement Debug (like the one from
// linux-embedded-hal).
impl<I2C> fmt::Debug for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: fmt::Debug,
    <I2C as i2c::Write>::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2cWriteReadError(i2c_error) => f
                .debug_tuple("Error::I2cWriteReadError")
                .field(i2c_error)
                .finish(),
            Error::I2cWriteError(i2c_error) => f
                .debug_tuple("Error::I2cWriteError")
                .field(i2c_error)
                .finish(),
            Error::LibraryError(err) => f.debug_tuple("Error::LibraryError").field(err).finish(),
        }
    }
}

impl<I2C> fmt::Display for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: fmt::Debug,
    <I2C as i2c::Write>::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2cWriteReadError(i2c_error) => {
                write!(f, "I2C write-read error: {:?}", i2c_error)
            }
            Error::I2cWriteError(i2c_error) => write!(f, "I2C write error: {:?}", i2c_error),
            Error::LibraryError(err) => write!(f, "Library Error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<I2C> std::error::Error for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: std::error::Error + 'static,
    <I2C as i2c::Write>::Error: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::I2cWriteReadError(i2c_error) => Some(i2c_error),
            Error::I2cWriteError(i2c_error) => Some(i2c_error),
            Error::LibraryError(lib_err) => Some(lib_err),
        }
    }
}

impl<I2C> From<LibraryError> for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    fn from(lib_err: LibraryError) -> Self {
        Self::LibraryError(lib_err)
    }
}

impl<I2C> From<PixelDefectError> for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    fn from(defect: PixelDefectError) -> Self {
        Self::LibraryError(LibraryError::Defect(defect))
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::string::ToString;

    use super::*;

    #[test]
    fn defect_display() {
        let too_many = PixelDefectError::TooManyBroken { count: 5 };
        assert_eq!(too_many.to_string(), "too many broken pixels (5)");
        let adjacent = PixelDefectError::AdjacentDefects {
            kind: DefectPairKind::BrokenOutlier,
            first: 40,
            second: 73,
        };
        assert_eq!(
            adjacent.to_string(),
            "broken pixel has an adjacent outlier pixel (40 and 73)"
        );
    }

    #[test]
    fn library_error_from_defect() {
        let defect = PixelDefectError::TooManyOutliers { count: 5 };
        assert_eq!(LibraryError::from(defect), LibraryError::Defect(defect));
    }
}
