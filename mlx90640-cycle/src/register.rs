// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Typed views of the MLX90640 status (0x8000) and control (0x800D) registers.
//!
//! Both registers are plain 16-bit words. The types here decode every field the camera documents
//! and encode back to the same word, so a read-modify-write through them leaves unrelated bits
//! alone (reserved bits excepted, which are never set by this crate).
use core::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::common::Address;
use crate::error::LibraryError;

/// A register in the camera's memory map that can be decoded from and encoded into one word.
pub trait Register: Into<u16> + From<u16> + Copy {
    const ADDRESS: Address;

    /// The bits the controller is allowed to change.
    const WRITE_MASK: u16;
}

fn flag(raw: u16, mask: u16) -> bool {
    raw & mask != 0
}

fn mask_if(mask: u16, set: bool) -> u16 {
    if set {
        mask
    } else {
        0
    }
}

// Status register bits
const STATUS_SUBPAGE: u16 = 0x0001;
const STATUS_NEW_DATA: u16 = 0x0008;
const STATUS_OVERWRITE: u16 = 0x0010;
const STATUS_START: u16 = 0x0020;

/// The status register (0x8000).
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct StatusRegister {
    /// The subpage the camera last wrote into RAM. Read-only.
    pub(crate) last_updated_subpage: Subpage,

    /// Set by the camera when a subpage lands in RAM, cleared by the controller.
    pub(crate) new_data: bool,

    pub(crate) overwrite_enabled: bool,

    /// Starts a measurement in step mode, cleared by the camera when it is done.
    pub(crate) start_measurement: bool,
}

impl StatusRegister {
    /// The word written back once a new subpage has been noticed (0x0030).
    ///
    /// The "new data" flag is cleared so the camera will flag the next subpage, and RAM stays
    /// overwritable.
    pub fn data_acknowledgement() -> Self {
        Self {
            last_updated_subpage: Subpage::Zero,
            new_data: false,
            overwrite_enabled: true,
            start_measurement: true,
        }
    }

    pub fn last_updated_subpage(&self) -> Subpage {
        self.last_updated_subpage
    }

    pub fn new_data(&self) -> bool {
        self.new_data
    }

    pub fn overwrite_enabled(&self) -> bool {
        self.overwrite_enabled
    }

    /// The subpage with fresh data in RAM, if there is any.
    pub fn ready_subpage(&self) -> Option<Subpage> {
        self.new_data.then(|| self.last_updated_subpage)
    }
}

impl Register for StatusRegister {
    const ADDRESS: Address = Address::new(0x8000);

    // The subpage bits are read-only.
    const WRITE_MASK: u16 = STATUS_NEW_DATA | STATUS_OVERWRITE | STATUS_START;
}

impl From<u16> for StatusRegister {
    fn from(raw: u16) -> Self {
        Self {
            // Bits 1 and 2 of the subpage field are reserved.
            last_updated_subpage: Subpage::from_bit(flag(raw, STATUS_SUBPAGE)),
            new_data: flag(raw, STATUS_NEW_DATA),
            overwrite_enabled: flag(raw, STATUS_OVERWRITE),
            start_measurement: flag(raw, STATUS_START),
        }
    }
}

impl From<StatusRegister> for u16 {
    fn from(status: StatusRegister) -> Self {
        status.last_updated_subpage as u16
            | mask_if(STATUS_NEW_DATA, status.new_data)
            | mask_if(STATUS_OVERWRITE, status.overwrite_enabled)
            | mask_if(STATUS_START, status.start_measurement)
    }
}

// Control register bits
const CONTROL_USE_SUBPAGES: u16 = 0x0001;
const CONTROL_STEP_MODE: u16 = 0x0002;
const CONTROL_DATA_HOLD: u16 = 0x0004;
const CONTROL_SUBPAGE_REPEAT: u16 = 0x0008;
// Three bits wide, but only the lowest one selects anything.
const CONTROL_SUBPAGE: u16 = 0x0010;
const CONTROL_FRAME_RATE_SHIFT: u16 = 7;
const CONTROL_RESOLUTION_SHIFT: u16 = 10;
const CONTROL_CHESS: u16 = 0x1000;

/// The control register (0x800D), which holds the camera's measurement configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct ControlRegister {
    pub(crate) use_subpages: bool,

    /// The camera idles until a measurement is started through the status register.
    pub(crate) step_mode: bool,

    /// Only copy measurements into RAM while the status register allows overwriting.
    pub(crate) data_hold: bool,

    /// Keep measuring `subpage` instead of alternating. Needs `use_subpages`.
    pub(crate) subpage_repeat: bool,

    pub(crate) subpage: Subpage,

    pub(crate) frame_rate: FrameRate,

    pub(crate) resolution: Resolution,

    pub(crate) access_pattern: AccessPattern,
}

impl ControlRegister {
    pub fn use_subpages(&self) -> bool {
        self.use_subpages
    }

    pub fn set_use_subpages(&mut self, use_subpages: bool) {
        self.use_subpages = use_subpages;
    }

    pub fn subpage_repeat(&self) -> bool {
        self.subpage_repeat
    }

    pub fn set_subpage_repeat(&mut self, subpage_repeat: bool) {
        self.subpage_repeat = subpage_repeat;
    }

    pub fn subpage(&self) -> Subpage {
        self.subpage
    }

    pub fn set_subpage(&mut self, subpage: Subpage) {
        self.subpage = subpage;
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    pub fn set_frame_rate(&mut self, frame_rate: FrameRate) {
        self.frame_rate = frame_rate;
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub fn access_pattern(&self) -> AccessPattern {
        self.access_pattern
    }

    pub fn set_access_pattern(&mut self, access_pattern: AccessPattern) {
        self.access_pattern = access_pattern;
    }
}

impl Default for ControlRegister {
    /// The power-on value, 0x1901.
    fn default() -> Self {
        Self {
            use_subpages: true,
            step_mode: false,
            data_hold: false,
            subpage_repeat: false,
            subpage: Subpage::Zero,
            frame_rate: FrameRate::default(),
            resolution: Resolution::default(),
            access_pattern: AccessPattern::Chess,
        }
    }
}

impl Register for ControlRegister {
    const ADDRESS: Address = Address::new(0x800D);

    // Bit 1 is documented as always 0, but it is still writable.
    const WRITE_MASK: u16 = 0x1FFF;
}

impl From<u16> for ControlRegister {
    fn from(raw: u16) -> Self {
        let access_pattern = if flag(raw, CONTROL_CHESS) {
            AccessPattern::Chess
        } else {
            AccessPattern::Interleave
        };
        Self {
            use_subpages: flag(raw, CONTROL_USE_SUBPAGES),
            step_mode: flag(raw, CONTROL_STEP_MODE),
            data_hold: flag(raw, CONTROL_DATA_HOLD),
            subpage_repeat: flag(raw, CONTROL_SUBPAGE_REPEAT),
            subpage: Subpage::from_bit(flag(raw, CONTROL_SUBPAGE)),
            frame_rate: FrameRate::from_raw(raw >> CONTROL_FRAME_RATE_SHIFT),
            resolution: Resolution::from_raw(raw >> CONTROL_RESOLUTION_SHIFT),
            access_pattern,
        }
    }
}

impl From<ControlRegister> for u16 {
    fn from(control: ControlRegister) -> Self {
        mask_if(CONTROL_USE_SUBPAGES, control.use_subpages)
            | mask_if(CONTROL_STEP_MODE, control.step_mode)
            | mask_if(CONTROL_DATA_HOLD, control.data_hold)
            | mask_if(CONTROL_SUBPAGE_REPEAT, control.subpage_repeat)
            | mask_if(CONTROL_SUBPAGE, control.subpage == Subpage::One)
            | control.frame_rate.as_raw() << CONTROL_FRAME_RATE_SHIFT
            | control.resolution.as_raw() << CONTROL_RESOLUTION_SHIFT
            | mask_if(CONTROL_CHESS, control.access_pattern == AccessPattern::Chess)
    }
}

/// One of the two halves of the pixel array the camera measures on alternating frames.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum Subpage {
    Zero = 0,
    One = 1,
}

impl Subpage {
    fn from_bit(set: bool) -> Self {
        if set {
            Self::One
        } else {
            Self::Zero
        }
    }
}

/// The rates the camera can measure subpages at. The discriminants are the control register's
/// encoding.
///
/// Faster rates need a faster bus. Roughly, a 100kHz bus keeps up with [4Hz][FrameRate::Four], a
/// 400kHz bus with [16Hz][FrameRate::Sixteen] and a 1MHz bus with [32Hz][FrameRate::ThirtyTwo].
/// With row-per-tick acquisition the main loop also has to call `tick` often enough to pull all
/// 26 rows within one frame period.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum FrameRate {
    Half = 0,
    One = 1,
    /// The power-on rate.
    Two = 2,
    Four = 3,
    Eight = 4,
    Sixteen = 5,
    ThirtyTwo = 6,
    SixtyFour = 7,
}

impl FrameRate {
    const ALL: [Self; 8] = [
        Self::Half,
        Self::One,
        Self::Two,
        Self::Four,
        Self::Eight,
        Self::Sixteen,
        Self::ThirtyTwo,
        Self::SixtyFour,
    ];

    /// Decode the low three bits of `raw`.
    pub(crate) fn from_raw(raw: u16) -> Self {
        Self::ALL[usize::from(raw & 0x7)]
    }

    pub(crate) fn as_raw(&self) -> u16 {
        *self as u16
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::Two
    }
}

impl TryFrom<f32> for FrameRate {
    type Error = LibraryError;

    /// Find the frame rate for a number of hertz. Only exact matches are accepted.
    /// ```
    /// # use core::convert::TryFrom;
    /// # use mlx90640_cycle::FrameRate;
    /// assert_eq!(FrameRate::try_from(0.5f32), Ok(FrameRate::Half));
    /// assert!(FrameRate::try_from(0.50001f32).is_err());
    /// ```
    fn try_from(hertz: f32) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|rate| f32::from(*rate) == hertz)
            .ok_or(LibraryError::InvalidData(
                "The given number does not match a valid frame rate",
            ))
    }
}

impl From<FrameRate> for f32 {
    /// Frames per second.
    fn from(frame_rate: FrameRate) -> Self {
        // Each step doubles the rate, starting from 0.5Hz.
        f32::from(1u8 << frame_rate.as_raw()) / 2.0
    }
}

/// The resolution of the camera's ADC. The discriminants are the control register's encoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Resolution {
    Sixteen = 0,
    Seventeen = 1,
    /// The power-on resolution.
    Eighteen = 2,
    Nineteen = 3,
}

impl Resolution {
    const ALL: [Self; 4] = [
        Self::Sixteen,
        Self::Seventeen,
        Self::Eighteen,
        Self::Nineteen,
    ];

    /// Decode the low two bits of `raw`.
    pub(crate) fn from_raw(raw: u16) -> Self {
        Self::ALL[usize::from(raw & 0x3)]
    }

    pub(crate) fn as_raw(&self) -> u16 {
        *self as u16
    }
}

impl TryFrom<u8> for Resolution {
    type Error = LibraryError;

    /// Find the resolution for a number of bits.
    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        bits.checked_sub(16)
            .and_then(|index| Self::ALL.get(usize::from(index)).copied())
            .ok_or(LibraryError::InvalidData(
                "The given value did not match a valid ADC resolution",
            ))
    }
}

impl From<Resolution> for u8 {
    /// The number of bits.
    fn from(resolution: Resolution) -> Self {
        16 + resolution.as_raw() as u8
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Eighteen
    }
}

/// How pixels are split between the two subpages.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AccessPattern {
    /// Neighbouring pixels are in different subpages, like the squares of a chess board.
    ///
    /// This is the power-on pattern, and the one MLX90640s are normally calibrated with.
    Chess = 1,

    /// Whole rows alternate between subpages.
    Interleave = 0,
}

#[cfg(test)]
mod test {
    use core::convert::TryFrom;

    use super::*;

    /// Decode `raw`, check one field, then check it encodes back to `raw`.
    fn check_field<R, T>(raw: u16, field: impl Fn(&R) -> T, expected: T)
    where
        R: Register,
        T: PartialEq + core::fmt::Debug,
    {
        let decoded = R::from(raw);
        assert_eq!(field(&decoded), expected);
        let encoded: u16 = decoded.into();
        assert_eq!(encoded, raw);
    }

    #[test]
    fn status_fields() {
        check_field(0x0001, StatusRegister::last_updated_subpage, Subpage::One);
        check_field(0x0000, StatusRegister::last_updated_subpage, Subpage::Zero);
        check_field(0x0008, StatusRegister::new_data, true);
        check_field(0x0010, StatusRegister::overwrite_enabled, true);
        check_field(0x0020, |s: &StatusRegister| s.start_measurement, true);
    }

    #[test]
    fn status_ignores_reserved_bits() {
        assert_eq!(
            StatusRegister::from(0xFFFE),
            StatusRegister::from(StatusRegister::WRITE_MASK)
        );
        // Bits 1 and 2 don't select a subpage.
        assert_eq!(
            StatusRegister::from(0x0006).last_updated_subpage(),
            Subpage::Zero
        );
    }

    #[test]
    fn status_ready_subpage() {
        assert_eq!(StatusRegister::from(0x0009).ready_subpage(), Some(Subpage::One));
        assert_eq!(StatusRegister::from(0x0018).ready_subpage(), Some(Subpage::Zero));
        assert_eq!(StatusRegister::from(0x0011).ready_subpage(), None);
    }

    #[test]
    fn status_acknowledgement() {
        assert_eq!(u16::from(StatusRegister::data_acknowledgement()), 0x0030);
    }

    #[test]
    fn control_flags() {
        check_field(0x0001, ControlRegister::use_subpages, true);
        check_field(0x0002, |c: &ControlRegister| c.step_mode, true);
        check_field(0x0004, |c: &ControlRegister| c.data_hold, true);
        check_field(0x0008, ControlRegister::subpage_repeat, true);
        check_field(0x0010, ControlRegister::subpage, Subpage::One);
        check_field(0x0000, ControlRegister::subpage, Subpage::Zero);
        check_field(0x1000, ControlRegister::access_pattern, AccessPattern::Chess);
        check_field(0x0000, ControlRegister::access_pattern, AccessPattern::Interleave);
    }

    #[test]
    fn control_frame_rate() {
        let expected = [
            FrameRate::Half,
            FrameRate::One,
            FrameRate::Two,
            FrameRate::Four,
            FrameRate::Eight,
            FrameRate::Sixteen,
            FrameRate::ThirtyTwo,
            FrameRate::SixtyFour,
        ];
        for (raw, rate) in expected.iter().enumerate() {
            check_field((raw as u16) << 7, ControlRegister::frame_rate, *rate);
        }
    }

    #[test]
    fn control_resolution() {
        check_field(0x0000, ControlRegister::resolution, Resolution::Sixteen);
        check_field(0x0400, ControlRegister::resolution, Resolution::Seventeen);
        check_field(0x0800, ControlRegister::resolution, Resolution::Eighteen);
        check_field(0x0C00, ControlRegister::resolution, Resolution::Nineteen);
    }

    #[test]
    fn control_ignores_reserved_bits() {
        assert_eq!(
            ControlRegister::from(0xFFFF),
            ControlRegister::from(ControlRegister::WRITE_MASK)
        );
    }

    #[test]
    fn control_power_on_value() {
        assert_eq!(ControlRegister::from(0x1901), ControlRegister::default());
        assert_eq!(u16::from(ControlRegister::default()), 0x1901);
    }

    #[test]
    fn frame_rate_hertz() {
        assert_eq!(f32::from(FrameRate::Half), 0.5);
        assert_eq!(f32::from(FrameRate::Two), 2.0);
        assert_eq!(f32::from(FrameRate::SixtyFour), 64.0);
        assert_eq!(FrameRate::try_from(16f32).unwrap(), FrameRate::Sixteen);
        assert!(FrameRate::try_from(3f32).is_err());
        // Don't try to add more zeros; much further and it rounds to 0.5.
        assert!(FrameRate::try_from(0.5000001f32).is_err());
    }

    #[test]
    fn resolution_bits() {
        assert_eq!(Resolution::try_from(16u8).unwrap(), Resolution::Sixteen);
        assert_eq!(Resolution::try_from(19u8).unwrap(), Resolution::Nineteen);
        assert!(Resolution::try_from(20u8).is_err());
        assert!(Resolution::try_from(1u8).is_err());
        assert_eq!(u8::from(Resolution::Seventeen), 17);
    }

    #[test]
    fn defaults() {
        assert_eq!(FrameRate::default(), FrameRate::Two);
        assert_eq!(Resolution::default(), Resolution::Eighteen);
    }
}
