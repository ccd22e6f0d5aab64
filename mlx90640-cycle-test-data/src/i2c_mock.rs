// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::rc::Rc;

use arrayvec::ArrayVec;
use embedded_hal::blocking::i2c;

use crate::eeprom_data::{datasheet_ram, mlx90640_datasheet_eeprom, NUM_WORDS};

const STATUS_REGISTER_ADDRESS: u16 = 0x8000;

// Bits 3 through 5 are writable. The subpage bits (0 through 2) are read-only, and the camera
// clears the start measurement bit (5) itself.
const STATUS_REGISTER_WRITE_MASK: u16 = 0x0038;

const CONTROL_REGISTER_ADDRESS: u16 = 0x800D;

// Only the top three bits of control register 1 are reserved.
const CONTROL_REGISTER_WRITE_MASK: u16 = 0x1FFF;

const RECENT_OPERATIONS_QUEUE_LENGTH: usize = 128;

// The camera can't return more than 32 words in one read.
const MAX_READ_BYTES: usize = 64;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MockError {
    /// The given address shouldn't be accessed.
    IllegalAccess(u16),

    /// The given address should not be written to.
    IllegalWriteAddress(u16),

    /// The given value is illegal for the given location.
    IllegalWriteValue(u16, u16),

    /// The given address isn't valid for a device.
    UnknownMemoryAddress(u16),

    /// An unknown I2C address was given.
    UnknownI2cAddress(u8),

    /// The requested operation is not allowed.
    ///
    /// This covers things situations such as:
    /// * A combined write-read transaction with a write amount other than 2 bytes.
    /// * A write-read transaction with a 0-length read.
    /// * Reads and writes that aren't a whole number of words.
    /// * Reads longer than the camera's burst limit.
    IllegalOperation,

    /// A failure requested with [`MockCameraBus::fail_next_operations`].
    Injected,
}

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for MockError {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum I2cOperation {
    /// A write, with the starting address and the payload length in bytes.
    Write { address: u16, length: usize },

    /// A read, with the starting address and the number of bytes read.
    Read { address: u16, length: usize },
}

/// An in-memory MLX90640.
///
/// Cloning a `MockCameraBus` shares the underlying memory, so a test can hand one clone to a
/// driver and keep the other to simulate the camera producing new frames.
#[derive(Clone, Debug)]
pub struct MockCameraBus {
    i2c_address: u8,
    rom_range: RangeInclusive<u16>,
    ram_range: RangeInclusive<u16>,
    eeprom_range: RangeInclusive<u16>,
    register_range: RangeInclusive<u16>,
    eeprom_data: Rc<RefCell<[u16; NUM_WORDS]>>,
    ram_data: Rc<RefCell<[u16; NUM_WORDS]>>,
    status_register: Rc<Cell<u16>>,
    control_register: Rc<Cell<u16>>,
    recent_operations: Rc<RefCell<VecDeque<I2cOperation>>>,
    pending_failures: Rc<Cell<usize>>,
    pending_write_failures: Rc<Cell<usize>>,
    last_written_word: Rc<Cell<Option<u16>>>,
}

impl MockCameraBus {
    pub fn new(
        i2c_address: u8,
        eeprom: &[u16; NUM_WORDS],
        ram: &[u16; NUM_WORDS],
        control_register: u16,
        status_register: u16,
    ) -> Self {
        MockCameraBus {
            i2c_address,
            rom_range: 0x0000..=0x03FF,
            ram_range: 0x0400..=0x073F,
            eeprom_range: 0x2400..=0x273F,
            register_range: 0x8000..=0x8016,
            eeprom_data: Rc::new(RefCell::new(*eeprom)),
            ram_data: Rc::new(RefCell::new(*ram)),
            status_register: Rc::new(Cell::new(status_register)),
            control_register: Rc::new(Cell::new(control_register)),
            recent_operations: Rc::new(RefCell::new(VecDeque::new())),
            pending_failures: Rc::new(Cell::new(0)),
            pending_write_failures: Rc::new(Cell::new(0)),
            last_written_word: Rc::new(Cell::new(None)),
        }
    }

    fn extract_address(&self, bytes: &[u8]) -> Result<u16, MockError> {
        if bytes.len() < 2 {
            return Err(MockError::IllegalOperation);
        }
        let address = u16::from_be_bytes([bytes[0], bytes[1]]);
        if self.rom_range.contains(&address)
            || self.ram_range.contains(&address)
            || self.eeprom_range.contains(&address)
            || self.register_range.contains(&address)
        {
            Ok(address)
        } else {
            Err(MockError::UnknownMemoryAddress(address))
        }
    }

    /// Copy `destination.len()` words starting at `start_address` into `destination`.
    pub fn get(&self, start_address: u16, destination: &mut [u16]) -> Result<(), MockError> {
        let word_count = destination.len() as u16;
        let end_address = start_address + word_count;
        if self.rom_range.contains(&start_address) {
            // Shouldn't access the ROM
            Err(MockError::IllegalAccess(start_address))
        } else if self.ram_range.contains(&start_address) {
            if self.ram_range.contains(&(end_address - 1)) {
                let start = (start_address - self.ram_range.start()) as usize;
                destination.copy_from_slice(&self.ram_data.borrow()[start..(start + destination.len())]);
                Ok(())
            } else {
                Err(MockError::IllegalAccess(end_address))
            }
        } else if self.eeprom_range.contains(&start_address) {
            if self.eeprom_range.contains(&(end_address - 1)) {
                let start = (start_address - self.eeprom_range.start()) as usize;
                destination
                    .copy_from_slice(&self.eeprom_data.borrow()[start..(start + destination.len())]);
                Ok(())
            } else {
                Err(MockError::IllegalAccess(end_address))
            }
        } else if self.register_range.contains(&start_address) {
            // The registers are non-contiguous, so only 1 word can be read at a time.
            if destination.len() != 1 {
                return Err(MockError::IllegalAccess(end_address));
            }
            destination[0] = match start_address {
                STATUS_REGISTER_ADDRESS => self.status_register.get(),
                CONTROL_REGISTER_ADDRESS => self.control_register.get(),
                _ => return Err(MockError::IllegalAccess(start_address)),
            };
            Ok(())
        } else {
            Err(MockError::UnknownMemoryAddress(start_address))
        }
    }

    /// Write words starting at `start_address`. Only the status and control registers can be
    /// written.
    pub fn set(&mut self, start_address: u16, data: &[u16]) -> Result<(), MockError> {
        if !self.register_range.contains(&start_address) {
            // ROM is read-only, only the camera writes RAM, and the EEPROM calibration data can't
            // be recovered if it's overwritten.
            return Err(MockError::IllegalWriteAddress(start_address));
        }
        if data.len() != 1 {
            return Err(MockError::IllegalWriteAddress(start_address + data.len() as u16));
        }
        let new_word = data[0];
        self.last_written_word.set(Some(new_word));
        match start_address {
            STATUS_REGISTER_ADDRESS => {
                let existing = self.status_register.get();
                let updated = (existing & !STATUS_REGISTER_WRITE_MASK)
                    | (new_word & STATUS_REGISTER_WRITE_MASK & 0x0018);
                self.status_register.set(updated);
                Ok(())
            }
            CONTROL_REGISTER_ADDRESS => {
                let existing = self.control_register.get();
                if (new_word & !CONTROL_REGISTER_WRITE_MASK)
                    != (existing & !CONTROL_REGISTER_WRITE_MASK)
                {
                    return Err(MockError::IllegalWriteValue(start_address, new_word));
                }
                self.control_register.set(new_word);
                Ok(())
            }
            _ => Err(MockError::IllegalWriteAddress(start_address)),
        }
    }

    /// Replace the current RAM and status register.
    ///
    /// This is to simulate a new frame of data being made available. This function does *not*
    /// explicitly set the "new data available" flag. The given status register is used as-is.
    pub fn update_frame(&mut self, ram_data: &[u16; NUM_WORDS], status_register: u16) {
        self.ram_data.borrow_mut().copy_from_slice(ram_data);
        self.status_register.set(status_register);
    }

    /// Overwrite part of the EEPROM, for fixtures that differ from the datasheet example.
    pub fn set_eeprom_words(&mut self, word_index: usize, words: &[u16]) {
        self.eeprom_data.borrow_mut()[word_index..(word_index + words.len())]
            .copy_from_slice(words);
    }

    /// Set the "new data available" flag in the status register to a new value.
    pub fn set_data_available(&mut self, available: bool) {
        let status = self.status_register.get();
        if available {
            self.status_register.set(status | 0x0008);
        } else {
            self.status_register.set(status & !0x0008);
        }
    }

    /// Set the "last updated subpage" bit in the status register (0 or 1).
    pub fn set_subpage(&mut self, subpage: u8) {
        let status = self.status_register.get() & !0x0007;
        self.status_register.set(status | u16::from(subpage & 0x1));
    }

    pub fn status_register(&self) -> u16 {
        self.status_register.get()
    }

    pub fn control_register(&self) -> u16 {
        self.control_register.get()
    }

    /// Make the next `count` transactions (reads or writes) fail.
    pub fn fail_next_operations(&self, count: usize) {
        self.pending_failures.set(count);
    }

    /// Make the next `count` writes fail, while letting reads through.
    pub fn fail_next_writes(&self, count: usize) {
        self.pending_write_failures.set(count);
    }

    fn take_failure(counter: &Cell<usize>) -> bool {
        let pending = counter.get();
        if pending > 0 {
            counter.set(pending - 1);
            true
        } else {
            false
        }
    }

    fn add_operation(&self, operation: I2cOperation) {
        let mut recent_ops = self.recent_operations.borrow_mut();
        recent_ops.push_front(operation);
        recent_ops.truncate(RECENT_OPERATIONS_QUEUE_LENGTH);
    }

    /// Successful operations, most recent first.
    pub fn recent_operations(&self) -> Ref<VecDeque<I2cOperation>> {
        self.recent_operations.borrow()
    }

    /// The word most recently written to a register, as it went over the bus.
    pub fn last_written_word(&self) -> Option<u16> {
        self.last_written_word.get()
    }

    pub fn operation_count(&self) -> usize {
        self.recent_operations.borrow().len()
    }

    pub fn clear_recent_operations(&self) {
        self.recent_operations.borrow_mut().clear()
    }
}

impl i2c::Write for MockCameraBus {
    type Error = MockError;

    fn write(&mut self, i2c_address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        if i2c_address != self.i2c_address {
            return Err(MockError::UnknownI2cAddress(i2c_address));
        }
        if Self::take_failure(&self.pending_failures)
            || Self::take_failure(&self.pending_write_failures)
        {
            return Err(MockError::Injected);
        }
        let address = self.extract_address(bytes)?;
        let payload = &bytes[2..];
        if payload.is_empty() || payload.len() % 2 != 0 {
            return Err(MockError::IllegalOperation);
        }
        let words: ArrayVec<u16, 31> = payload
            .chunks_exact(2)
            .map(|word| u16::from_be_bytes([word[0], word[1]]))
            .collect();
        self.set(address, &words)?;
        self.add_operation(I2cOperation::Write {
            address,
            length: payload.len(),
        });
        Ok(())
    }
}

impl i2c::WriteRead for MockCameraBus {
    type Error = MockError;

    fn write_read(
        &mut self,
        i2c_address: u8,
        write_buffer: &[u8],
        out_buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        if i2c_address != self.i2c_address {
            return Err(MockError::UnknownI2cAddress(i2c_address));
        }
        // Write-reads should only be writing the address, so write_buffer should only be two bytes
        if write_buffer.len() != 2
            || out_buffer.is_empty()
            || out_buffer.len() % 2 != 0
            || out_buffer.len() > MAX_READ_BYTES
        {
            return Err(MockError::IllegalOperation);
        }
        if Self::take_failure(&self.pending_failures) {
            return Err(MockError::Injected);
        }
        let address = self.extract_address(write_buffer)?;
        let mut words = [0u16; MAX_READ_BYTES / 2];
        let words = &mut words[..(out_buffer.len() / 2)];
        self.get(address, words)?;
        out_buffer
            .chunks_exact_mut(2)
            .zip(words.iter())
            .for_each(|(bytes, word)| bytes.copy_from_slice(&word.to_be_bytes()));
        self.add_operation(I2cOperation::Read {
            address,
            length: out_buffer.len(),
        });
        Ok(())
    }
}

/// A mock camera loaded with the datasheet worked example.
///
/// The control register is the power-on default (0x1901: chess pattern, 18-bit ADC, 2Hz) and the
/// status register says subpage 0 has new data.
pub fn datasheet_mlx90640_at_address(i2c_address: u8) -> MockCameraBus {
    MockCameraBus::new(
        i2c_address,
        &mlx90640_datasheet_eeprom(),
        &datasheet_ram(),
        0x1901,
        0x0008,
    )
}
