// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

/// The number of 16-bit words in the EEPROM, and in the RAM window read by the driver.
///
/// 0x273F is the last EEPROM address and 0x073F the last RAM address used, with 0x2400 and 0x0400
/// as the respective starts.
pub const NUM_WORDS: usize = 0x2740 - 0x2400;

/// Example MLX90640 EEPROM data from the datasheet (from the worked example).
// Each line is 8 words. The first two lines are empty, as that data is ignored for calibration
// purposes. The next six lines are the shared calibration data.
#[rustfmt::skip]
const MLX90640_EEPROM_HEADER: [u16; 64] = [
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x4210, 0xFFBB, 0x0202, 0xF202, 0xF2F2, 0xE2E2, 0xD1E1, 0xB1D1,
    0xF10F, 0xF00F, 0xE0EF, 0xE0EF, 0xE1E1, 0xF3F2, 0xF404, 0xE504,
    0x79A6, 0x2F44, 0xFFDD, 0x2210, 0x3333, 0x2233, 0xEF01, 0x9ACC,
    0xEEDC, 0x10FF, 0x2221, 0x3333, 0x2333, 0x0112, 0xEEFF, 0xBBDD,
    0x18EF, 0x2FF1, 0x5952, 0x9D68, 0x5454, 0x0994, 0x6956, 0x5354,
    0x2363, 0xE446, 0xFBB5, 0x044B, 0xF020, 0x9797, 0x9797, 0x2889,
];

/// The per-pixel calibration word used in the worked example, repeated for every pixel.
const DATASHEET_PIXEL_CALIBRATION: u16 = 0x08A0;

/// The raw pixel reading used in the worked example, repeated for every pixel.
const DATASHEET_PIXEL_READING: u16 = 0x0261;

/// Create a buffer with the example MLX90640 EEPROM data.
pub fn mlx90640_datasheet_eeprom() -> [u16; NUM_WORDS] {
    let mut eeprom = [DATASHEET_PIXEL_CALIBRATION; NUM_WORDS];
    eeprom[..MLX90640_EEPROM_HEADER.len()].copy_from_slice(&MLX90640_EEPROM_HEADER);
    eeprom
}

/// Create a RAM image using the worked example readings.
///
/// Every pixel has the same reading, and the auxiliary values are placed at their word offsets
/// from 0x0400. Reserved words are left at zero.
pub fn datasheet_ram() -> [u16; NUM_WORDS] {
    let mut ram = [0u16; NUM_WORDS];
    ram[..768].fill(DATASHEET_PIXEL_READING);
    // Ta_Vbe (0x0700)
    ram[768] = 0x4BF2;
    // CP, subpage 0 (0x0708)
    ram[776] = 0xFFCA;
    // Gain (0x070A)
    ram[778] = 0x1881;
    // Ta_PTAT (0x0720)
    ram[800] = 0x06AF;
    // CP, subpage 1 (0x0728)
    ram[808] = 0xFFC8;
    // VDDpix (0x072A)
    ram[810] = 0xCCC5;
    ram
}
