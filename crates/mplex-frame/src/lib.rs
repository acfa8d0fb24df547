//! Checksummed message frames packed into self-describing groups.
//!
//! A group is one contiguous buffer:
//! - A 13-byte group header (magic `0xAA`, version, timestamp, frame count,
//!   header length, 8-bit header CRC)
//! - Any number of frames, each a 5-byte header (magic `0x7E`, 7-bit ID,
//!   11-bit length, 14-bit CRC) followed by its payload
//! - The End-Of-Group frame `7E FE 00 00 00`
//!
//! Readers recover from corruption by scanning for the next magic byte whose
//! frame checks out; a bad frame costs only itself.

pub mod bitint;
pub mod codec;
pub mod error;
pub mod frame;
pub mod group;
pub mod header;
pub mod ids;
pub mod reader;
pub mod wire;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use bitint::{DataLen, FrameCrc, HeaderCrc, HeaderLen, MsgId, NumFrames, SmallUint};
pub use codec::{decode_group, decode_group_eof, encode_group, GroupConfig};
pub use error::{FrameError, Result};
pub use frame::{Frame, Mode};
pub use group::Group;
pub use header::{
    FrameHeader, GroupHeader, END_OF_GROUP_BYTES, FRAME_HEADER_SIZE, FRAME_MAGIC, FRAME_MAX_SIZE,
    GROUP_HEADER_SIZE, GROUP_MAGIC, GROUP_MAX_SIZE, GROUP_MIN_SIZE, MAX_FRAMES, MAX_PAYLOAD,
};
pub use ids::{END_OF_GROUP, MAX_USER_ID};
pub use reader::GroupReader;
pub use wire::WireValue;
pub use writer::GroupWriter;

#[cfg(feature = "async")]
pub use async_codec::GroupCodec;
