use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;

use crate::error::{CrcError, Result};
use crate::poly::{mask, poly_for_width, MAX_WIDTH, MIN_TABLE_WIDTH};

type Table = [u64; 256];

type TableCache = RwLock<HashMap<(u32, u64), Arc<Table>>>;

/// Lookup tables keyed by `(width, polynomial)`, built on first use.
static TABLES: OnceCell<TableCache> = OnceCell::new();

fn tables() -> &'static TableCache {
    TABLES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// A CRC engine for one `(width, polynomial)` pair.
///
/// Cloning is cheap: the lookup table is shared.
#[derive(Debug, Clone)]
pub struct Crc {
    width: u32,
    poly: u64,
    mask: u64,
    table: Arc<Table>,
}

impl Crc {
    /// Engine for `width` bits with generator polynomial `poly`.
    ///
    /// The table is fetched from the process-wide cache, or generated and
    /// inserted on first use.
    pub fn new(width: u32, poly: u64) -> Result<Self> {
        if !(MIN_TABLE_WIDTH..=MAX_WIDTH).contains(&width) {
            return Err(CrcError::UnsupportedWidth {
                width,
                min: MIN_TABLE_WIDTH,
                max: MAX_WIDTH,
            });
        }
        if poly == 0 || poly >> (width + 1) != 0 {
            return Err(CrcError::InvalidPolynomial { width, poly });
        }

        Ok(Self {
            width,
            poly,
            mask: mask(width),
            table: cached_table(width, poly),
        })
    }

    /// Engine for `width` bits using the registered polynomial.
    pub fn for_width(width: u32) -> Result<Self> {
        let poly = poly_for_width(width).ok_or(CrcError::UnsupportedWidth {
            width,
            min: MIN_TABLE_WIDTH,
            max: MAX_WIDTH,
        })?;
        Self::new(width, poly)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn poly(&self) -> u64 {
        self.poly
    }

    /// All-ones value of this engine's width.
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Checksum of `data` starting from `init` (masked to the width).
    pub fn checksum(&self, data: &[u8], init: u64) -> u64 {
        let mut digest = self.digest(init);
        digest.update(data);
        digest.finalize()
    }

    /// Start an incremental computation.
    pub fn digest(&self, init: u64) -> Digest<'_> {
        Digest {
            crc: self,
            value: init & self.mask,
        }
    }
}

/// Incremental CRC state over several slices.
#[derive(Debug)]
pub struct Digest<'a> {
    crc: &'a Crc,
    value: u64,
}

impl Digest<'_> {
    pub fn update(&mut self, data: &[u8]) {
        let shift = self.crc.width - 8;
        let mut value = self.value;
        for &byte in data {
            let index = ((value >> shift) as u8 ^ byte) as usize;
            value = (self.crc.table[index] ^ (value << 8)) & self.crc.mask;
        }
        self.value = value;
    }

    pub fn finalize(self) -> u64 {
        self.value
    }
}

/// One-shot checksum: `width`-bit CRC of `data` with `poly`, seeded by `init`.
pub fn crc(width: u32, poly: u64, data: &[u8], init: u64) -> Result<u64> {
    Ok(Crc::new(width, poly)?.checksum(data, init))
}

fn cached_table(width: u32, poly: u64) -> Arc<Table> {
    let key = (width, poly);
    if let Some(table) = tables()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Arc::clone(table);
    }

    let mut cache = tables().write().unwrap_or_else(PoisonError::into_inner);
    let table = cache.entry(key).or_insert_with(|| {
        tracing::trace!(width, poly, "generating CRC lookup table");
        Arc::new(generate_table(width, poly))
    });
    Arc::clone(table)
}

fn generate_table(width: u32, poly: u64) -> Table {
    let top_bit = 1u64 << (width - 1);
    let mask = mask(width);
    let mut table = [0u64; 256];

    for (i, entry) in table.iter_mut().enumerate() {
        let mut crc = (i as u64) << (width - 8);
        for _ in 0..8 {
            crc = if crc & top_bit == 0 {
                crc << 1
            } else {
                (crc << 1) ^ poly
            };
        }
        *entry = crc & mask;
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::{CRC_INIT, POLY_TABLE};

    fn bitwise(width: u32, poly: u64, data: &[u8], init: u64) -> u64 {
        let top_bit = 1u64 << (width - 1);
        let mask = mask(width);
        let mut crc = init & mask;
        for &byte in data {
            crc ^= (byte as u64) << (width - 8);
            for _ in 0..8 {
                crc = if crc & top_bit == 0 {
                    crc << 1
                } else {
                    (crc << 1) ^ poly
                };
                crc &= mask;
            }
        }
        crc
    }

    fn sample_data() -> Vec<u8> {
        (0..=255u8).chain(b"mplex message group".iter().copied()).collect()
    }

    #[test]
    fn table_matches_bitwise_reference() {
        let data = sample_data();
        for width in MIN_TABLE_WIDTH..=MAX_WIDTH {
            let poly = POLY_TABLE[width as usize];
            let engine = Crc::new(width, poly).unwrap();
            assert_eq!(
                engine.checksum(&data, CRC_INIT),
                bitwise(width, poly, &data, CRC_INIT),
                "CRC-{width}"
            );
        }
    }

    #[test]
    fn crc8_check_value() {
        // CRC-8/SMBUS (poly 0x07) over "123456789" is 0xF4.
        let value = crc(8, 0x107, b"123456789", 0).unwrap();
        assert_eq!(value, 0xF4);
    }

    #[test]
    fn crc32_mpeg2_check_value() {
        // CRC-32/MPEG-2: init 0xFFFFFFFF, not reflected, no final XOR.
        let value = crc(32, 0x1_04C1_1DB7, b"123456789", 0xFFFF_FFFF).unwrap();
        assert_eq!(value, 0x0376_E6E7);
    }

    #[test]
    fn digest_over_slices_equals_one_shot() {
        let data = sample_data();
        let engine = Crc::for_width(14).unwrap();

        let mut digest = engine.digest(CRC_INIT);
        digest.update(&data[..7]);
        digest.update(&data[7..100]);
        digest.update(&data[100..]);

        assert_eq!(digest.finalize(), engine.checksum(&data, CRC_INIT));
    }

    #[test]
    fn result_fits_width() {
        let engine = Crc::for_width(14).unwrap();
        let value = engine.checksum(&[0xFF; 64], CRC_INIT);
        assert!(value <= 0x3FFF);
    }

    #[test]
    fn nonzero_init_separates_zero_runs() {
        let engine = Crc::for_width(14).unwrap();
        let short = engine.checksum(&[0; 4], CRC_INIT);
        let long = engine.checksum(&[0; 5], CRC_INIT);
        assert_ne!(short, 0);
        assert_ne!(short, long);
        assert_eq!(engine.checksum(&[0; 16], 0), 0);
    }

    #[test]
    fn tables_are_shared_between_engines() {
        let a = Crc::new(16, POLY_TABLE[16]).unwrap();
        let b = Crc::new(16, POLY_TABLE[16]).unwrap();
        assert!(Arc::ptr_eq(&a.table, &b.table));
    }

    #[test]
    fn cache_is_populated_on_first_use() {
        let crc = Crc::for_width(12).unwrap();
        let cache = tables().read().unwrap();
        let cached = cache.get(&(12, POLY_TABLE[12])).unwrap();
        assert!(Arc::ptr_eq(cached, &crc.table));
    }

    #[test]
    fn rejects_unsupported_widths() {
        assert!(matches!(
            Crc::new(7, POLY_TABLE[7]),
            Err(CrcError::UnsupportedWidth { width: 7, .. })
        ));
        assert!(matches!(
            Crc::new(33, 0x3),
            Err(CrcError::UnsupportedWidth { width: 33, .. })
        ));
        assert!(matches!(
            Crc::for_width(40),
            Err(CrcError::UnsupportedWidth { width: 40, .. })
        ));
    }

    #[test]
    fn rejects_bad_polynomials() {
        assert!(matches!(
            Crc::new(8, 0),
            Err(CrcError::InvalidPolynomial { .. })
        ));
        assert!(matches!(
            Crc::new(8, 0x3FF),
            Err(CrcError::InvalidPolynomial { .. })
        ));
    }
}
