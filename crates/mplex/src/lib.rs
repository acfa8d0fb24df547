//! Checksummed multiplexed message framing.
//!
//! Messages travel as frames (5-byte header with a 14-bit CRC) packed into
//! groups (13-byte header with an 8-bit CRC, closed by an End-Of-Group
//! frame). Receivers resynchronize past corruption one byte at a time.
//!
//! # Crate Structure
//!
//! - [`crc`]: Table-driven CRCs of any width from 8 to 32 bits
//! - [`frame`]: Frames, groups, byte stuffing and stream codecs

/// Re-export checksum types.
pub mod crc {
    pub use mplex_crc::*;
}

/// Re-export frame and group types.
pub mod frame {
    pub use mplex_frame::*;
}
