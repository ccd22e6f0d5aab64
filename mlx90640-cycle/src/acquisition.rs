// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Non-blocking acquisition of subframes, one step per tick.
//!
//! Reading a whole subframe at once takes a while on slower buses, so instead the RAM window is
//! pulled in one 32-word row at a time. Each call to [`Acquisition::tick`] does one step and
//! returns straight away:
//!
//! 1. Poll the status register. If there's new data, acknowledge it and note which subpage it is.
//! 2. Read the next row into the [`RawFrame`], 26 times.
//! 3. Report the subpage as ready to compensate, and go back to polling.
use embedded_hal::blocking::i2c;

use crate::address::RamAddress;
use crate::bus::{read_register, read_words, write_register};
use crate::common::{Address, WIDTH};
use crate::error::Error;
use crate::frame::{RawFrame, NUM_ROWS};
use crate::register::{StatusRegister, Subpage};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionState {
    /// Acquisition is disabled.
    Idle,

    /// Polling the status register for a new subframe.
    AwaitingSubframe,

    /// Copying the RAM window, `next_row` is the next row to read.
    ReadingRows { subpage: Subpage, next_row: usize },

    /// Every row has been read, the next tick hands the subframe off for compensation.
    ReadyToCompensate { subpage: Subpage },
}

impl Default for AcquisitionState {
    fn default() -> Self {
        Self::Idle
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Acquisition {
    state: AcquisitionState,
}

impl Acquisition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state != AcquisitionState::Idle
    }

    /// Start or stop acquisition.
    ///
    /// Stopping drops any partially read subframe. Enabling while already enabled leaves the
    /// current state alone.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.state = AcquisitionState::Idle;
        } else if !self.is_enabled() {
            self.state = AcquisitionState::AwaitingSubframe;
        }
    }

    /// Advance by one step.
    ///
    /// Every step is at most one bus transfer, except for a poll that finds new data: the
    /// acknowledgement is written in the same tick as the status read, so that the camera can
    /// start on the next subpage straight away.
    ///
    /// Returns the subpage that `frame` now holds on the tick it should be compensated, and `None`
    /// otherwise. If the bus fails, the error is returned and the state is left where it was, so
    /// the next tick retries the same step.
    pub fn tick<I2C>(
        &mut self,
        bus: &mut I2C,
        i2c_address: u8,
        frame: &mut RawFrame,
    ) -> Result<Option<Subpage>, Error<I2C>>
    where
        I2C: i2c::WriteRead + i2c::Write,
    {
        match self.state {
            AcquisitionState::Idle => Ok(None),
            AcquisitionState::AwaitingSubframe => {
                let status: StatusRegister = read_register(bus, i2c_address)?;
                if let Some(subpage) = status.ready_subpage() {
                    // Let the camera carry on writing into RAM.
                    write_register(bus, i2c_address, StatusRegister::data_acknowledgement())?;
                    self.state = AcquisitionState::ReadingRows {
                        subpage,
                        next_row: 0,
                    };
                }
                Ok(None)
            }
            AcquisitionState::ReadingRows { subpage, next_row } => {
                let row_address = Address::from(RamAddress::Base).offset((next_row * WIDTH) as u16);
                read_words(bus, i2c_address, row_address, frame.row_mut(next_row))?;
                self.state = if next_row + 1 < NUM_ROWS {
                    AcquisitionState::ReadingRows {
                        subpage,
                        next_row: next_row + 1,
                    }
                } else {
                    AcquisitionState::ReadyToCompensate { subpage }
                };
                Ok(None)
            }
            AcquisitionState::ReadyToCompensate { subpage } => {
                self.state = AcquisitionState::AwaitingSubframe;
                Ok(Some(subpage))
            }
        }
    }
}
