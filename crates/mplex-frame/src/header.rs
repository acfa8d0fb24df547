//! v0 frame and group headers.
//!
//! Headers are never overlaid onto a buffer: every field is packed and
//! unpacked through explicit shifts, so the byte image is identical on every
//! host. All multi-bit fields are big-endian.
//!
//! Frame header, 5 bytes:
//! ```text
//!  0          8        15            26             40
//! ┌──────────┬────────┬─────────────┬──────────────┐
//! │ Magic    │ ID     │ Data length │ CRC          │
//! │ 0x7E (8) │ (7)    │ (11)        │ (14)         │
//! └──────────┴────────┴─────────────┴──────────────┘
//! ```
//!
//! Group header, 13 bytes:
//! ```text
//! ┌──────────┬──────────┬────────────┬────────────┬────────────┬────────────┬──────────┐
//! │ Magic    │ Version  │ Time (sec) │ Time (ns)  │ # Frames   │ Header len │ Hdr CRC  │
//! │ 0xAA (8) │ (8)      │ (32)       │ (32)       │ (11)       │ (5)        │ (8)      │
//! └──────────┴──────────┴────────────┴────────────┴────────────┴────────────┴──────────┘
//! ```

use mplex_crc::POLY_TABLE;

use crate::bitint::{DataLen, FrameCrc, HeaderCrc, HeaderLen, MsgId, NumFrames};

/// Frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 5;

/// First byte of every frame.
pub const FRAME_MAGIC: u8 = 0x7E;

/// Reserved ID of the End-Of-Group frame.
pub const END_OF_GROUP_ID: u8 = 127;

/// Largest payload a frame can carry (11-bit length field).
pub const MAX_PAYLOAD: usize = DataLen::MAX as usize;

/// Largest frame: header plus maximum payload.
pub const FRAME_MAX_SIZE: usize = FRAME_HEADER_SIZE + MAX_PAYLOAD;

/// Frame CRC width.
pub const FRAME_CRC_WIDTH: u32 = 14;

/// Frame CRC generator polynomial.
pub const FRAME_CRC_POLY: u64 = POLY_TABLE[FRAME_CRC_WIDTH as usize];

/// Byte image of the End-Of-Group frame.
pub const END_OF_GROUP_BYTES: [u8; FRAME_HEADER_SIZE] =
    [FRAME_MAGIC, END_OF_GROUP_ID << 1, 0x00, 0x00, 0x00];

/// Group header size in bytes.
pub const GROUP_HEADER_SIZE: usize = 13;

/// First byte of every group.
pub const GROUP_MAGIC: u8 = 0xAA;

/// Protocol version carried in the group header.
pub const GROUP_VERSION: u8 = 0;

/// Group header CRC width.
pub const GROUP_CRC_WIDTH: u32 = 8;

/// Group header CRC generator polynomial.
pub const GROUP_CRC_POLY: u64 = POLY_TABLE[GROUP_CRC_WIDTH as usize];

/// Smallest group: header plus the End-Of-Group frame.
pub const GROUP_MIN_SIZE: usize = GROUP_HEADER_SIZE + FRAME_HEADER_SIZE;

/// Largest group buffer.
pub const GROUP_MAX_SIZE: usize = u16::MAX as usize;

/// Most frames a group header can count.
pub const MAX_FRAMES: usize = NumFrames::MAX as usize;

const ID_SHIFT: u32 = 25;
const LEN_SHIFT: u32 = 14;
const NUM_FRAMES_SHIFT: u32 = 5;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    pub magic: u8,
    pub id: MsgId,
    pub len: DataLen,
    pub crc: FrameCrc,
}

impl Default for FrameHeader {
    /// The End-Of-Group header.
    fn default() -> Self {
        Self::end_of_group()
    }
}

impl FrameHeader {
    pub fn end_of_group() -> Self {
        Self {
            magic: FRAME_MAGIC,
            id: MsgId::masked(END_OF_GROUP_ID as u64),
            len: DataLen::default(),
            crc: FrameCrc::default(),
        }
    }

    /// Unpack a header from the first [`FRAME_HEADER_SIZE`] bytes of `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` is shorter than a frame header.
    pub fn decode(src: &[u8]) -> Self {
        let word = u32::from_be_bytes([src[1], src[2], src[3], src[4]]);
        Self {
            magic: src[0],
            id: MsgId::masked((word >> ID_SHIFT) as u64),
            len: DataLen::masked((word >> LEN_SHIFT) as u64),
            crc: FrameCrc::masked(word as u64),
        }
    }

    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let word = (self.id.get() as u32) << ID_SHIFT
            | (self.len.get() as u32) << LEN_SHIFT
            | self.crc.get() as u32;
        let [b1, b2, b3, b4] = word.to_be_bytes();
        [self.magic, b1, b2, b3, b4]
    }

    /// Writes the header into the first [`FRAME_HEADER_SIZE`] bytes of `dst`.
    pub fn encode_into(&self, dst: &mut [u8]) {
        dst[..FRAME_HEADER_SIZE].copy_from_slice(&self.encode());
    }

    /// Header-only End-Of-Group check (no CRC pass).
    pub fn is_end_of_group(&self) -> bool {
        self.magic == FRAME_MAGIC
            && self.id.get() == END_OF_GROUP_ID
            && self.len.get() == 0
            && self.crc.get() == 0
    }

    /// Byte image with the CRC bits cleared, as fed to the checksum.
    pub fn crc_image(&self) -> [u8; FRAME_HEADER_SIZE] {
        Self {
            crc: FrameCrc::default(),
            ..*self
        }
        .encode()
    }
}

/// Decoded group header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GroupHeader {
    pub magic: u8,
    pub vers: u8,
    pub timestamp_sec: u32,
    pub timestamp_nsec: u32,
    pub num_frames: NumFrames,
    pub header_len: HeaderLen,
    pub hcrc: HeaderCrc,
}

impl GroupHeader {
    /// Unpack a header from the first [`GROUP_HEADER_SIZE`] bytes of `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` is shorter than a group header.
    pub fn decode(src: &[u8]) -> Self {
        let packed = u16::from_be_bytes([src[10], src[11]]);
        Self {
            magic: src[0],
            vers: src[1],
            timestamp_sec: u32::from_be_bytes([src[2], src[3], src[4], src[5]]),
            timestamp_nsec: u32::from_be_bytes([src[6], src[7], src[8], src[9]]),
            num_frames: NumFrames::masked((packed >> NUM_FRAMES_SHIFT) as u64),
            header_len: HeaderLen::masked(packed as u64),
            hcrc: HeaderCrc::masked(src[12] as u64),
        }
    }

    pub fn encode(&self) -> [u8; GROUP_HEADER_SIZE] {
        let mut out = [0u8; GROUP_HEADER_SIZE];
        out[0] = self.magic;
        out[1] = self.vers;
        out[2..6].copy_from_slice(&self.timestamp_sec.to_be_bytes());
        out[6..10].copy_from_slice(&self.timestamp_nsec.to_be_bytes());
        let packed = self.num_frames.get() << NUM_FRAMES_SHIFT | self.header_len.get() as u16;
        out[10..12].copy_from_slice(&packed.to_be_bytes());
        out[12] = self.hcrc.get();
        out
    }

    /// Byte image with the header CRC cleared, as fed to the checksum.
    pub fn crc_image(&self) -> [u8; GROUP_HEADER_SIZE] {
        Self {
            hcrc: HeaderCrc::default(),
            ..*self
        }
        .encode()
    }

    /// Timestamp as `sec << 32 | nsec`.
    pub fn timestamp(&self) -> u64 {
        (self.timestamp_sec as u64) << 32 | self.timestamp_nsec as u64
    }
}
