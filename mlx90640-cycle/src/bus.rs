// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Word-oriented access to the camera over an `embedded-hal` I²C bus.
//!
//! Every value on the camera is a big-endian 16-bit word. Reads are a combined write-read (the
//! two address bytes, then the data), and writes are the address bytes followed by the data in a
//! single write. The camera limits how much can be moved in one transaction, so anything larger
//! than [`MAX_READ_WORDS`] has to go through [`read_words_chunked`].
use arrayvec::ArrayVec;
use embedded_hal::blocking::i2c;

use crate::common::Address;
use crate::error::{Error, LibraryError};
use crate::register::Register;

/// The most words a single read transaction may return.
pub const MAX_READ_WORDS: usize = 32;

/// The most words a single write transaction may carry.
pub const MAX_WRITE_WORDS: usize = 31;

const WORD_SIZE: usize = 2;

/// Read `destination.len()` consecutive words starting at `start` in a single transaction.
///
/// An empty destination is a no-op. More than [`MAX_READ_WORDS`] words is rejected without
/// touching the bus.
pub fn read_words<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    start: Address,
    destination: &mut [u16],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    if destination.is_empty() {
        return Ok(());
    }
    if destination.len() > MAX_READ_WORDS {
        return Err(LibraryError::TransferTooLong {
            requested: destination.len(),
            maximum: MAX_READ_WORDS,
        }
        .into());
    }
    let mut bytes = [0u8; MAX_READ_WORDS * WORD_SIZE];
    let bytes = &mut bytes[..(destination.len() * WORD_SIZE)];
    bus.write_read(i2c_address, &start.as_bytes(), bytes)
        .map_err(Error::I2cWriteReadError)?;
    destination
        .iter_mut()
        .zip(bytes.chunks_exact(WORD_SIZE))
        .for_each(|(word, word_bytes)| *word = u16::from_be_bytes([word_bytes[0], word_bytes[1]]));
    Ok(())
}

/// Read any number of words, split into [`MAX_READ_WORDS`]-sized transactions.
pub fn read_words_chunked<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    start: Address,
    destination: &mut [u16],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    for (chunk_index, chunk) in destination.chunks_mut(MAX_READ_WORDS).enumerate() {
        let offset = (chunk_index * MAX_READ_WORDS) as u16;
        read_words(bus, i2c_address, start.offset(offset), chunk)?;
    }
    Ok(())
}

/// Write consecutive words starting at `start` in a single transaction.
pub fn write_words<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    start: Address,
    words: &[u16],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    if words.is_empty() {
        return Ok(());
    }
    if words.len() > MAX_WRITE_WORDS {
        return Err(LibraryError::TransferTooLong {
            requested: words.len(),
            maximum: MAX_WRITE_WORDS,
        }
        .into());
    }
    let mut payload: ArrayVec<u8, { WORD_SIZE + MAX_WRITE_WORDS * WORD_SIZE }> = ArrayVec::new();
    payload.extend(start.as_bytes());
    for word in words {
        payload.extend(word.to_be_bytes());
    }
    bus.write(i2c_address, &payload).map_err(Error::I2cWriteError)?;
    Ok(())
}

pub fn read_register<R, I2C>(bus: &mut I2C, i2c_address: u8) -> Result<R, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    R: Register,
{
    let mut raw = [0u16; 1];
    read_words(bus, i2c_address, R::ADDRESS, &mut raw)?;
    Ok(R::from(raw[0]))
}

/// Write a register, with any bits outside its write mask cleared.
pub fn write_register<R, I2C>(bus: &mut I2C, i2c_address: u8, register: R) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    R: Register,
{
    let raw: u16 = register.into();
    write_words(bus, i2c_address, R::ADDRESS, &[raw & R::WRITE_MASK])
}
