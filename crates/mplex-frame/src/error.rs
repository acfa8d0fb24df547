use mplex_crc::CrcError;

use crate::frame::Mode;

/// Errors that can occur while building, reading or transporting frames and
/// groups.
///
/// Integrity problems (bad magic, CRC mismatch) are not errors: they are
/// reported by [`Frame::is_valid`](crate::Frame::is_valid) and
/// [`Group::header_is_valid`](crate::Group::header_is_valid).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer cannot hold a frame header.
    #[error("buffer too small ({size} bytes, min {min})")]
    BufferTooSmall { size: usize, min: usize },

    /// The buffer is larger than the largest possible frame.
    #[error("buffer too large ({size} bytes, max {max})")]
    BufferTooLarge { size: usize, max: usize },

    /// Mode flags outside of read/write were requested.
    #[error("invalid mode flags {0:#04b}")]
    InvalidMode(u8),

    /// The requested group buffer size is outside the protocol bounds.
    #[error("group size {size} outside {min}..={max}")]
    GroupSizeOutOfRange { size: usize, min: usize, max: usize },

    /// The operation needs a capability the current mode lacks.
    #[error("{op} not permitted in {mode:?} mode")]
    ModeNotPermitted { op: &'static str, mode: Mode },

    /// Not enough room left in the buffer.
    #[error("out of space ({needed} bytes needed, {available} available)")]
    OutOfSpace { needed: usize, available: usize },

    /// The payload does not fit the frame length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The group cannot take another frame.
    #[error("group full ({frames} frames, {remaining} bytes left)")]
    GroupFull { frames: usize, remaining: usize },

    /// An encoded group exceeds the configured maximum.
    #[error("group too large ({size} bytes, max {max})")]
    GroupTooLarge { size: usize, max: usize },

    /// A value does not fit a bit-width field.
    #[error("value {value} does not fit in {bits} bits")]
    FieldOverflow { value: u64, bits: u32 },

    /// Data frames may not use the End-Of-Group ID.
    #[error("message id {0} is reserved")]
    ReservedId(u8),

    /// The operation requires a frame whose CRC checks out.
    #[error("frame is not valid")]
    InvalidFrame,

    /// The operation requires a group header whose CRC checks out.
    #[error("group header is not valid")]
    InvalidGroupHeader,

    /// The sequence to avoid must be at least two bytes long.
    #[error("avoid sequence too short ({0} bytes, min 2)")]
    AvoidSequenceTooShort(usize),

    /// A stuffed prefix is not followed by its escape byte.
    #[error("unescaped delimiter prefix at payload offset {offset}")]
    StuffingCorrupt { offset: usize },

    /// The CRC engine rejected its parameters.
    #[error("checksum error: {0}")]
    Crc(#[from] CrcError),

    /// An I/O error occurred while reading or writing groups.
    #[error("group I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete group was received.
    #[error("connection closed (incomplete group)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
