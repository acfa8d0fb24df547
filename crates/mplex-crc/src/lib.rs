//! Table-driven CRC engine for arbitrary bit widths.
//!
//! This is the lowest layer of mplex. Checksums are computed MSB-first
//! (non-reflected, no final XOR) for any width between [`MIN_TABLE_WIDTH`]
//! and [`MAX_WIDTH`] bits:
//! - Generator polynomials include the explicit `x^N` term (see [`POLY_TABLE`])
//! - Lookup tables are generated on first use and memoized per
//!   `(width, polynomial)` pair
//! - Multi-slice input is supported through [`Digest`]

pub mod engine;
pub mod error;
pub mod poly;

pub use engine::{crc, Crc, Digest};
pub use error::{CrcError, Result};
pub use poly::{mask, poly_for_width, CRC_INIT, MAX_WIDTH, MIN_TABLE_WIDTH, POLY_TABLE};
