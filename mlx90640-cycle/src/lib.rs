// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! A pure-Rust, non-blocking driver for the MLX90640 thermal camera over I²C.
//!
//! The MLX90640 ships with a large block of factory calibration data in its EEPROM, and the raw
//! readings it produces need a fair amount of processing before they become temperatures. This
//! crate splits that work into three pieces:
//!
//! * [`calibration`] decodes the 832-word EEPROM dump into [`Mlx90640Calibration`], rejecting
//!   cameras whose defective pixel layout makes the calibration untrustworthy.
//! * [`acquisition`] is a small state machine that refills a [`RawFrame`] one 32-word row at a
//!   time, so a caller's main loop is never stuck waiting on a full frame transfer.
//! * [`calculations`] turns a filled `RawFrame` into an ambient temperature and a grid of object
//!   temperatures for one subpage.
//!
//! [`Mlx90640Driver`] ties the three together behind a single [`tick`][Mlx90640Driver::tick]
//! method.
//!
//! This library uses the [`embedded-hal`][embedded-hal] I²C traits, so any platform with an
//! `embedded-hal` 0.2 I²C implementation should work. It is also `no_std` compatible, with either
//! the `std` or `libm` feature providing the floating point math.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal/0.2/embedded_hal/blocking/i2c/index.html
//!
//! # Example
//! ```no_run
//! use mlx90640_cycle::{Mlx90640Driver, DEFAULT_ADDRESS};
//! use linux_embedded_hal::I2cdev;
//!
//! let i2c_bus = I2cdev::new("/dev/i2c-1").expect("/dev/i2c-1 needs to be an I2C controller");
//! let mut camera = Mlx90640Driver::new(i2c_bus, DEFAULT_ADDRESS)?;
//! camera.set_cycling(true);
//! loop {
//!     // Each call does at most a small, bounded amount of bus traffic.
//!     if camera.tick()? {
//!         let temperatures = camera.temperatures();
//!         println!("Centre pixel: {:.2}℃", temperatures[12 * 32 + 16]);
//!     }
//!     // Other work for the main loop goes here.
//! #   break;
//! }
//! # Ok::<(), mlx90640_cycle::Error<I2cdev>>(())
//! ```
//!
//! # Subpages and Access Patterns
//! The MLX90640 only updates half of its pixels each frame. Which half is a
//! [subpage][Subpage], and the [access pattern][AccessPattern] decides how pixels are split
//! between the two subpages (a chess board by default, or alternating rows). A full image needs
//! one compensation pass per subpage; pixels from the other subpage keep their previous values.

#![no_std]
#![allow(clippy::float_cmp)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("Either the 'std' or 'libm' feature must be enabled.");

pub mod acquisition;
mod address;
pub mod bus;
pub mod calculations;
pub mod calibration;
pub mod common;
#[doc(hidden)]
pub mod driver;
#[doc(hidden)]
pub mod error;
pub mod frame;
pub mod register;
mod util;

pub use acquisition::{Acquisition, AcquisitionState};
pub use calibration::{Mlx90640Calibration, PixelDefects};
pub use common::{Address, FromI2C, HEIGHT, NUM_PIXELS, WIDTH};
#[doc(inline)]
pub use driver::{Mlx90640Driver, SerialNumber, DEFAULT_ADDRESS};
#[doc(inline)]
pub use error::{DefectPairKind, Error, LibraryError, PixelDefectError};
pub use frame::{CompensatedFrame, RawFrame};
pub use register::*;
