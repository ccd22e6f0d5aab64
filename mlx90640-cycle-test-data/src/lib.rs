// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Fixtures for testing `mlx90640-cycle`: the datasheet worked example and an in-memory camera
//! that speaks the `embedded-hal` blocking I²C traits.
mod eeprom_data;
mod i2c_mock;

pub use eeprom_data::{datasheet_ram, mlx90640_datasheet_eeprom, NUM_WORDS};
pub use i2c_mock::{datasheet_mlx90640_at_address, I2cOperation, MockCameraBus, MockError};
