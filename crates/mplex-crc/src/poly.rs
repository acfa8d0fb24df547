//! Generator polynomials and shared constants.
//!
//! Polynomials come from Koopman's CRC zoo and are written with the explicit
//! `+1` term, i.e. `0x6E57` is Koopman's `0x372B`. They favour a Hamming
//! distance of 4 at longer data lengths.

/// Smallest width supported by the byte-wise lookup table.
pub const MIN_TABLE_WIDTH: u32 = 8;

/// Largest supported width.
pub const MAX_WIDTH: u32 = 32;

/// Seed mixed into every checksum so that all-zero data of any length does
/// not checksum to zero. Callers mask it down to the CRC width.
pub const CRC_INIT: u64 = 0xDEAD_BEEF_FEED_FACE;

/// Generator polynomial per CRC width. Widths 0..=2 have none.
pub const POLY_TABLE: [u64; 33] = [
    0x0,
    0x0,
    0x0,
    0xB,
    0x13,
    0x3D,
    0x67,
    0xCB,
    0x12F,
    0x2FB,
    0x48F,
    0xB07,
    0x11E7,
    0x25CD,
    0x6E57, // HD=4 up to 8176 bits
    0x860D,
    0x1_A2EB,
    0x2_2CBB,
    0x4_0031,
    0xE_F61F,
    0x18_359F,
    0x21_BF1F,
    0x49_0F29,
    0x80_02A9,
    0x132_8B63,
    0x217_745B,
    0x4F1_692B,
    0xE8B_D17F,
    0x16CF_6A23,
    0x2000_00BF,
    0x44A8_653B,
    0xA554_8665,
    0x1_04C1_1DB7,
];

/// Polynomial registered for `width`, if any.
pub fn poly_for_width(width: u32) -> Option<u64> {
    POLY_TABLE
        .get(width as usize)
        .copied()
        .filter(|poly| *poly != 0)
}

/// All-ones value of `width` bits.
pub fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
