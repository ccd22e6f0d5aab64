// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

/// Define a public getter for a field with the same name.
#[doc(hidden)]
#[macro_export]
macro_rules! expose_member {
    ($(#[$meta:meta])* $name:ident, $typ:ty) => {
        $(#[$meta])*
        pub fn $name(&self) -> $typ {
            self.$name
        }
    };
    ($(#[$meta:meta])* &$name:ident, $typ:ty) => {
        $(#[$meta])*
        pub fn $name(&self) -> &$typ {
            &self.$name
        }
    };
}

/// Check bit `index` (0 is the LSB).
pub(crate) fn is_bit_set(word: u16, index: u32) -> bool {
    unsigned_field(word, index, 1) == 1
}

/// Pull `num_bits` bits out of `word` (starting at bit `shift`) and sign-extend them.
///
/// Most of the EEPROM values are two's complement integers narrower than a word, packed next to
/// each other.
pub(crate) fn signed_field(word: u16, shift: u32, num_bits: u32) -> i16 {
    let unsigned = unsigned_field(word, shift, num_bits) as i16;
    let shift_amount = 16 - num_bits;
    (unsigned << shift_amount) >> shift_amount
}

/// Pull `num_bits` bits out of `word`, starting at bit `shift`.
pub(crate) fn unsigned_field(word: u16, shift: u32, num_bits: u32) -> u16 {
    let mask = if num_bits >= 16 {
        u16::MAX
    } else {
        (1u16 << num_bits) - 1
    };
    (word >> shift) & mask
}

#[cfg(test)]
mod test {
    #[test]
    fn is_bit_set() {
        for n in 0..16 {
            assert!(super::is_bit_set(1 << n, n), "bit {} not set", n);
            assert!(!super::is_bit_set(!(1 << n), n), "bit {} set", n);
        }
    }

    #[test]
    fn signed_field() {
        assert_eq!(super::signed_field(0x00FF, 0, 8), -1);
        assert_eq!(super::signed_field(0x03FF, 0, 10), -1);
        // Upper bits get ignored
        assert_eq!(super::signed_field(0xF0FF, 0, 8), -1);
        assert_eq!(super::signed_field(0xF3FF, 0, 10), -1);
        assert_eq!(super::signed_field(0x007F, 0, 8), 127);
        // Shifted fields
        assert_eq!(super::signed_field(0xFC00, 10, 6), -1);
        assert_eq!(super::signed_field(0x7C00, 10, 6), 31);
        assert_eq!(super::signed_field(0x000E, 1, 3), -1);
        assert_eq!(super::signed_field(0x8000, 0, 16), i16::MIN);
    }

    #[test]
    fn unsigned_field() {
        assert_eq!(super::unsigned_field(0xABCD, 4, 4), 0xC);
        assert_eq!(super::unsigned_field(0xABCD, 12, 4), 0xA);
        assert_eq!(super::unsigned_field(0xABCD, 0, 16), 0xABCD);
    }
}
