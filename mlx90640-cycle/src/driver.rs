// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use core::fmt;

use embedded_hal::blocking::i2c;
use paste::paste;

use crate::acquisition::{Acquisition, AcquisitionState};
use crate::address::EepromAddress;
use crate::bus::{read_register, read_words, write_register};
use crate::calculations;
use crate::calibration::Mlx90640Calibration;
use crate::common::{FromI2C, NUM_PIXELS};
use crate::error::Error;
use crate::frame::{CompensatedFrame, RawFrame};
use crate::register::*;

/// The I²C address MLX90640s ship with.
pub const DEFAULT_ADDRESS: u8 = 0x33;

/// DRY macro for the set_* methods in `Mlx90640Driver` that modify a control register field.
///
/// Most of the fields are boolean values, so that's the default type. Otherwise, add the type in
/// before the docstring.
macro_rules! set_register_field {
    { $field:ident, $doc:literal } => {
        set_register_field! {
            $field,
            bool,
            $doc
        }
    };
    { $field:ident, $typ:ty, $doc:literal } => {
    paste! {
        #[doc = $doc]
        ///
        /// The control register is re-read first, and nothing is written if the field already
        /// has the requested value.
        pub fn [< set_ $field >](&mut self, new_value: $typ) -> Result<(), Error<I2C>> {
            let mut current = self.refresh_configuration()?;
            if current.$field() != new_value {
                current.[< set_ $field >](new_value);
                self.set_control_register(current)
            } else {
                Ok(())
            }
        }
    }};
}

/// The unique ID of a camera, three words from the EEPROM.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SerialNumber([u16; 3]);

impl SerialNumber {
    pub fn words(&self) -> [u16; 3] {
        self.0
    }
}

impl From<SerialNumber> for [u16; 3] {
    fn from(serial: SerialNumber) -> Self {
        serial.0
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}{:04X}{:04X}", self.0[0], self.0[1], self.0[2])
    }
}

#[cfg(feature = "defmt")]
fn log_transition(previous: AcquisitionState, current: AcquisitionState, failed: bool) {
    if failed {
        defmt::warn!("I²C failure in acquisition state {}", previous);
    } else if let (AcquisitionState::AwaitingSubframe, AcquisitionState::ReadingRows { subpage, .. }) =
        (previous, current)
    {
        defmt::debug!("New data for subpage {}", subpage);
    }
}

#[cfg(not(feature = "defmt"))]
fn log_transition(_previous: AcquisitionState, _current: AcquisitionState, _failed: bool) {}

/// A driver for the MLX90640 that spreads acquisition out over many short [`tick`] calls.
///
/// The driver owns the bus, the camera's calibration data, a cached copy of the control register,
/// the raw frame being filled and the latest temperatures. Acquisition starts disabled, enable it
/// with [`set_cycling`].
///
/// [`tick`]: Mlx90640Driver::tick
/// [`set_cycling`]: Mlx90640Driver::set_cycling
#[derive(Clone, Debug)]
pub struct Mlx90640Driver<I2C> {
    /// The I²C bus this camera is accessible on.
    bus: I2C,

    /// The I²C address this camera is accessible at.
    address: u8,

    /// The factory calibration data for a specific camera.
    calibration: Mlx90640Calibration,

    /// The control register, as of construction or the last configuration change.
    control: ControlRegister,

    acquisition: Acquisition,

    raw_frame: RawFrame,

    compensated: CompensatedFrame,

    /// The subpage of the most recent compensation pass.
    last_subpage: Option<Subpage>,
}

impl<I2C> Mlx90640Driver<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    /// Create a new driver, reading the calibration data from the camera over I²C.
    ///
    /// This fails if the camera's EEPROM marks an unusable set of defective pixels.
    pub fn new(bus: I2C, address: u8) -> Result<Self, Error<I2C>> {
        let mut bus = bus;
        let calibration = Mlx90640Calibration::from_i2c(&mut bus, address)?;
        Self::new_with_calibration(bus, address, calibration)
    }

    /// Create a driver for a camera whose calibration has already been loaded.
    ///
    /// MLX90640s can be configured to use any I²C address (except 0x00), but the default address
    /// is [0x33][DEFAULT_ADDRESS].
    pub fn new_with_calibration(
        bus: I2C,
        address: u8,
        calibration: Mlx90640Calibration,
    ) -> Result<Self, Error<I2C>> {
        let mut bus = bus;
        let control: ControlRegister = read_register(&mut bus, address)?;
        Ok(Self {
            bus,
            address,
            calibration,
            control,
            acquisition: Acquisition::new(),
            raw_frame: RawFrame::default(),
            compensated: CompensatedFrame::default(),
            last_subpage: None,
        })
    }

    /// Advance acquisition by one step.
    ///
    /// Most ticks do a single bus transfer. The exception is the tick that notices a new
    /// subframe, which reads the status register and then writes the acknowledgement back.
    ///
    /// Returns `true` only on the tick that finished computing temperatures for a new subpage.
    /// Bus errors are returned, but acquisition picks up where it left off on the next call.
    pub fn tick(&mut self) -> Result<bool, Error<I2C>> {
        let previous = self.acquisition.state();
        let result = self
            .acquisition
            .tick(&mut self.bus, self.address, &mut self.raw_frame);
        log_transition(previous, self.acquisition.state(), result.is_err());
        let ready = result?;
        match ready {
            Some(subpage) => {
                self.compensate(subpage);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn compensate(&mut self, subpage: Subpage) {
        let t_a = calculations::compensate(
            &self.calibration,
            &self.raw_frame,
            subpage,
            self.control.access_pattern(),
            self.control.resolution(),
            &mut self.compensated.temperatures,
        );
        self.compensated.ambient_temperature = Some(t_a);
        self.last_subpage = Some(subpage);
        #[cfg(feature = "defmt")]
        defmt::debug!("Compensated subpage {}, ambient {=f32}°C", subpage, t_a);
    }

    /// Enable or disable acquisition.
    ///
    /// Disabling discards any partially read subframe, and the next enable starts from polling
    /// the status register. Enabling while already cycling does nothing.
    pub fn set_cycling(&mut self, enabled: bool) {
        self.acquisition.set_enabled(enabled);
    }

    pub fn is_cycling(&self) -> bool {
        self.acquisition.is_enabled()
    }

    pub fn acquisition_state(&self) -> AcquisitionState {
        self.acquisition.state()
    }

    /// The latest object temperatures in °C, row-major.
    ///
    /// Pixels that haven't been computed yet are NaN.
    pub fn temperatures(&self) -> &[f32; NUM_PIXELS] {
        self.compensated.temperatures()
    }

    pub fn compensated_frame(&self) -> &CompensatedFrame {
        &self.compensated
    }

    /// The ambient temperature from the most recent compensation pass.
    pub fn ambient_temperature(&self) -> Option<f32> {
        self.compensated.ambient_temperature()
    }

    /// The subpage the most recent compensation pass covered.
    pub fn last_subpage(&self) -> Option<Subpage> {
        self.last_subpage
    }

    /// The raw frame being filled by acquisition.
    ///
    /// While acquisition is reading rows this is a mix of two subframes.
    pub fn raw_frame(&self) -> &RawFrame {
        &self.raw_frame
    }

    pub fn calibration(&self) -> &Mlx90640Calibration {
        &self.calibration
    }

    /// Check if there is new data available, and if so, which subpage.
    ///
    /// This doesn't acknowledge the data, or change the acquisition state.
    pub fn data_available(&mut self) -> Result<Option<Subpage>, Error<I2C>> {
        let status: StatusRegister = read_register(&mut self.bus, self.address)?;
        Ok(status.ready_subpage())
    }

    /// Read the camera's unique ID.
    pub fn serial_number(&mut self) -> Result<SerialNumber, Error<I2C>> {
        let mut words = [0u16; 3];
        read_words(
            &mut self.bus,
            self.address,
            EepromAddress::DeviceId.into(),
            &mut words,
        )?;
        Ok(SerialNumber(words))
    }

    /// The cached control register.
    pub fn configuration(&self) -> ControlRegister {
        self.control
    }

    /// Re-read the control register from the camera, replacing the cached copy.
    pub fn refresh_configuration(&mut self) -> Result<ControlRegister, Error<I2C>> {
        self.control = read_register(&mut self.bus, self.address)?;
        #[cfg(feature = "defmt")]
        defmt::debug!("Control register is {=u16:#X}", u16::from(self.control));
        Ok(self.control)
    }

    fn set_control_register(&mut self, register: ControlRegister) -> Result<(), Error<I2C>> {
        write_register(&mut self.bus, self.address, register)?;
        self.control = register;
        #[cfg(feature = "defmt")]
        defmt::debug!("Control register set to {=u16:#X}", u16::from(register));
        Ok(())
    }

    /// Check if the camera is using subpages.
    ///
    /// When disabled, only one page will be measured. The default is to use subpages.
    pub fn subpages_enabled(&self) -> bool {
        self.control.use_subpages()
    }

    set_register_field! {
        use_subpages,
        "Enable (or disable) the use of subpages."
    }

    /// Check if the camera is in subpage repeat mode.
    ///
    /// In subpage repeat mode, only the subpage set in `selected_subpage` will be measured and
    /// updated. When disabled, the active subpage will alternate between the two. The default is
    /// disabled.
    pub fn subpage_repeat(&self) -> bool {
        self.control.subpage_repeat()
    }

    set_register_field! {
        subpage_repeat,
        "Enable (or disable) subpage repeat mode."
    }

    /// The subpage measured when [subpage repeat][Mlx90640Driver::subpage_repeat] is enabled.
    pub fn selected_subpage(&self) -> Subpage {
        self.control.subpage()
    }

    set_register_field! {
        subpage,
        Subpage,
        "Set the subpage measured when [subpage repeat][Mlx90640Driver::subpage_repeat] is enabled."
    }

    /// The default frame rate is [2 FPS][FrameRate::Two].
    pub fn frame_rate(&self) -> FrameRate {
        self.control.frame_rate()
    }

    set_register_field! {
        frame_rate,
        FrameRate,
        "Set camera's frame rate."
    }

    /// The resolution of the ADC in the camera.
    ///
    /// The default resolution is [18 bits][Resolution::Eighteen].
    pub fn resolution(&self) -> Resolution {
        self.control.resolution()
    }

    set_register_field! {
        resolution,
        Resolution,
        "Set ADC resolution within the camera."
    }

    /// The access pattern used by the camera when updating subpages.
    ///
    /// The default is the [chess pattern][AccessPattern::Chess].
    pub fn access_pattern(&self) -> AccessPattern {
        self.control.access_pattern()
    }

    set_register_field! {
        access_pattern,
        AccessPattern,
        "Set the access pattern used by the camera."
    }

    /// Consume the driver, returning the I²C bus.
    pub fn release(self) -> I2C {
        self.bus
    }
}
