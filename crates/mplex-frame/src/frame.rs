use std::fmt;

use mplex_crc::{Crc, CRC_INIT};

use crate::bitint::{DataLen, FrameCrc, MsgId};
use crate::error::{FrameError, Result};
use crate::header::{
    FrameHeader, FRAME_CRC_POLY, FRAME_CRC_WIDTH, FRAME_HEADER_SIZE, FRAME_MAGIC, FRAME_MAX_SIZE,
    MAX_PAYLOAD,
};
use crate::ids;
use crate::wire::WireValue;

/// Operational mode of a [`Frame`] or [`Group`](crate::Group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    Read,
    Write,
    #[default]
    ReadWrite,
}

impl Mode {
    /// Read capability flag.
    pub const READ: u8 = 0b01;
    /// Write capability flag.
    pub const WRITE: u8 = 0b10;

    /// Build a mode from capability flags. Empty or unknown flags are rejected.
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            Self::READ => Ok(Self::Read),
            Self::WRITE => Ok(Self::Write),
            0b11 => Ok(Self::ReadWrite),
            other => Err(FrameError::InvalidMode(other)),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Read => Self::READ,
            Self::Write => Self::WRITE,
            Self::ReadWrite => Self::READ | Self::WRITE,
        }
    }

    pub fn can_read(self) -> bool {
        self.bits() & Self::READ != 0
    }

    pub fn can_write(self) -> bool {
        self.bits() & Self::WRITE != 0
    }
}

/// Outcome of looking at a frame candidate without binding a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    EndOfGroup,
    Valid(usize),
    Invalid,
}

/// A zero-copy view of one serialized frame inside a caller-owned buffer.
///
/// The view reads and writes typed values at a cursor just past the header,
/// finalizes the header (length and CRC) and validates frames received from
/// elsewhere. It never allocates except while byte-stuffing.
pub struct Frame<'a> {
    buf: &'a mut [u8],
    header: FrameHeader,
    cursor: usize,
    mode: Mode,
}

impl<'a> Frame<'a> {
    /// Smallest buffer a frame can be bound to.
    pub const MIN_SIZE: usize = FRAME_HEADER_SIZE;
    /// Largest buffer a frame can be bound to.
    pub const MAX_SIZE: usize = FRAME_MAX_SIZE;

    /// Bind a frame view to `buf` and load the header from its first bytes.
    pub fn new(buf: &'a mut [u8], mode: Mode) -> Result<Self> {
        check_buffer_size(buf.len())?;
        let header = FrameHeader::decode(buf);
        Ok(Self {
            buf,
            header,
            cursor: 0,
            mode,
        })
    }

    /// Re-bind this view to another buffer.
    ///
    /// On error the view keeps its previous binding.
    pub fn reset(&mut self, buf: &'a mut [u8], mode: Mode) -> Result<()> {
        *self = Self::new(buf, mode)?;
        Ok(())
    }

    /// Reload the header from the buffer and move the cursor back to the
    /// start of the payload.
    pub fn rewind(&mut self) {
        self.header = FrameHeader::decode(self.buf);
        self.cursor = 0;
    }

    /// Copy a serialized frame into the start of the bound buffer, then
    /// rewind with `mode`.
    pub fn copy_from(&mut self, src: &[u8], mode: Mode) -> Result<()> {
        if src.len() > self.buf.len() {
            return Err(FrameError::OutOfSpace {
                needed: src.len(),
                available: self.buf.len(),
            });
        }
        self.buf[..src.len()].copy_from_slice(src);
        self.mode = mode;
        self.rewind();
        Ok(())
    }

    /// Write one value at the cursor (big-endian) and advance past it.
    pub fn write_data<T: WireValue>(&mut self, value: T) -> Result<()> {
        self.require_write("write_data")?;
        let start = self.reserve(T::SIZE)?;
        let mut dst = &mut self.buf[start..start + T::SIZE];
        value.put(&mut dst);
        self.cursor += T::SIZE;
        Ok(())
    }

    /// Read one value at the cursor (big-endian) and advance past it.
    pub fn read_data<T: WireValue>(&mut self) -> Result<T> {
        self.require_read("read_data")?;
        let start = self.reserve(T::SIZE)?;
        let mut src = &self.buf[start..start + T::SIZE];
        let value = T::get(&mut src);
        self.cursor += T::SIZE;
        Ok(value)
    }

    /// Write a run of raw bytes at the cursor.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.require_write("write_bytes")?;
        let start = self.reserve(data.len())?;
        self.buf[start..start + data.len()].copy_from_slice(data);
        self.cursor += data.len();
        Ok(())
    }

    /// Read `len` raw bytes at the cursor.
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        self.require_read("read_bytes")?;
        let start = self.reserve(len)?;
        self.cursor += len;
        Ok(&self.buf[start..start + len])
    }

    /// Finalize the frame: the length becomes the number of payload bytes
    /// processed so far and the CRC is computed over header and payload.
    pub fn write_header(&mut self, id: u8) -> Result<()> {
        if self.cursor > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: self.cursor,
                max: MAX_PAYLOAD,
            });
        }
        if ids::is_reserved(id) {
            return Err(FrameError::ReservedId(id));
        }

        let mut header = FrameHeader {
            magic: FRAME_MAGIC,
            id: MsgId::new(id as u64)?,
            len: DataLen::new(self.cursor as u64)?,
            crc: FrameCrc::default(),
        };
        let payload = &self.buf[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + self.cursor];
        header.crc = FrameCrc::masked(frame_crc(&header.encode(), payload)? as u64);
        header.encode_into(self.buf);
        self.header = header;
        Ok(())
    }

    /// True when the magic number matches, the declared length fits the
    /// buffer and the CRC over header and payload checks out.
    pub fn is_valid(&self) -> bool {
        validated_size(self.buf, &self.header).is_some()
    }

    /// True for the End-Of-Group frame. Only the header is inspected.
    pub fn is_end_of_group(&self) -> bool {
        self.header.is_end_of_group()
    }

    /// Escape every occurrence of `avoid[..n - 1]` in the payload written so
    /// far by inserting `!avoid[n - 1]` right after it, so `avoid` can never
    /// appear in the payload.
    ///
    /// Must run before [`write_header`](Self::write_header), which then
    /// records the stuffed length. Returns the number of bytes inserted.
    pub fn byte_stuff(&mut self, avoid: &[u8]) -> Result<usize> {
        self.require_write("byte_stuff")?;
        let (prefix, escape) = split_avoid(avoid)?;

        let old_len = self.cursor;
        let positions = find_all(
            &self.buf[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + old_len],
            prefix,
            prefix.len(),
        );
        if positions.is_empty() {
            return Ok(0);
        }

        let capacity = self.buf.len() - FRAME_HEADER_SIZE;
        let new_len = old_len + positions.len();
        if new_len > capacity {
            return Err(FrameError::OutOfSpace {
                needed: new_len,
                available: capacity,
            });
        }

        // Shift segments back to front so nothing is overwritten before it moves.
        let payload = &mut self.buf[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + new_len];
        let mut src_end = old_len;
        let mut dst_end = new_len;
        for &pos in positions.iter().rev() {
            let insert_at = pos + prefix.len();
            let segment = src_end - insert_at;
            payload.copy_within(insert_at..src_end, dst_end - segment);
            dst_end -= segment + 1;
            payload[dst_end] = escape;
            src_end = insert_at;
        }
        debug_assert_eq!(src_end, dst_end);

        self.cursor = new_len;
        Ok(positions.len())
    }

    /// Inverse of [`byte_stuff`](Self::byte_stuff) on a valid frame.
    ///
    /// Every occurrence of `avoid[..n - 1]` must be followed by the escape
    /// byte, which is removed. The in-memory length shrinks accordingly while
    /// the serialized header is left alone, so the frame no longer validates
    /// afterwards. Returns the number of bytes removed.
    pub fn byte_destuff(&mut self, avoid: &[u8]) -> Result<usize> {
        let (prefix, escape) = split_avoid(avoid)?;
        if !self.is_valid() {
            return Err(FrameError::InvalidFrame);
        }

        let len = self.header.len.get() as usize;
        let payload = &mut self.buf[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + len];
        let positions = find_all(payload, prefix, avoid.len());
        for &pos in &positions {
            let escape_at = pos + prefix.len();
            if payload.get(escape_at) != Some(&escape) {
                return Err(FrameError::StuffingCorrupt { offset: pos });
            }
        }
        if positions.is_empty() {
            return Ok(0);
        }

        let mut escapes = positions.iter().map(|pos| pos + prefix.len()).peekable();
        let mut write = 0;
        for read in 0..len {
            if escapes.peek() == Some(&read) {
                escapes.next();
                continue;
            }
            payload[write] = payload[read];
            write += 1;
        }

        self.header.len = DataLen::masked(write as u64);
        self.cursor = self.cursor.min(write);
        Ok(positions.len())
    }

    /// Header plus declared payload length, or 0 if the frame is not valid.
    pub fn msg_size(&self) -> usize {
        validated_size(self.buf, &self.header).unwrap_or(0)
    }

    /// Header plus payload bytes read or written so far.
    pub fn processed_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.cursor
    }

    pub fn id(&self) -> u8 {
        self.header.id.get()
    }

    pub fn len(&self) -> u16 {
        self.header.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn crc(&self) -> u16 {
        self.header.crc.get()
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Payload bytes read or written so far.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Payload bytes still available past the cursor.
    pub fn remaining(&self) -> usize {
        self.buf.len() - FRAME_HEADER_SIZE - self.cursor
    }

    /// Declared payload, or `None` for the End-Of-Group frame.
    pub fn payload(&self) -> Option<&[u8]> {
        if self.is_end_of_group() {
            return None;
        }
        let end = (FRAME_HEADER_SIZE + self.len() as usize).min(self.buf.len());
        Some(&self.buf[FRAME_HEADER_SIZE..end])
    }

    /// Payload bytes read or written so far.
    pub fn processed(&self) -> &[u8] {
        &self.buf[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + self.cursor]
    }

    /// The whole bound buffer.
    pub fn buf(&self) -> &[u8] {
        self.buf
    }

    fn reserve(&self, size: usize) -> Result<usize> {
        let available = self.remaining();
        if size > available {
            return Err(FrameError::OutOfSpace {
                needed: size,
                available,
            });
        }
        Ok(FRAME_HEADER_SIZE + self.cursor)
    }

    fn require_read(&self, op: &'static str) -> Result<()> {
        if self.mode.can_read() {
            Ok(())
        } else {
            Err(FrameError::ModeNotPermitted {
                op,
                mode: self.mode,
            })
        }
    }

    fn require_write(&self, op: &'static str) -> Result<()> {
        if self.mode.can_write() {
            Ok(())
        } else {
            Err(FrameError::ModeNotPermitted {
                op,
                mode: self.mode,
            })
        }
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("header", &self.header)
            .field("cursor", &self.cursor)
            .field("mode", &self.mode)
            .field("buf_len", &self.buf.len())
            .finish()
    }
}

/// Classify the frame candidate at the start of `buf`.
pub(crate) fn probe(buf: &[u8]) -> Probe {
    if buf.len() < FRAME_HEADER_SIZE {
        return Probe::Invalid;
    }
    let header = FrameHeader::decode(buf);
    if header.is_end_of_group() {
        return Probe::EndOfGroup;
    }
    match validated_size(buf, &header) {
        Some(size) => Probe::Valid(size),
        None => Probe::Invalid,
    }
}

/// Frame size if `header` describes a valid frame at the start of `buf`.
///
/// The header image fed to the CRC comes from the buffer with its CRC bits
/// cleared on a copy; the buffer itself is never touched.
fn validated_size(buf: &[u8], header: &FrameHeader) -> Option<usize> {
    if header.magic != FRAME_MAGIC {
        return None;
    }
    let size = FRAME_HEADER_SIZE + header.len.get() as usize;
    if size > buf.len() || size > FRAME_MAX_SIZE {
        return None;
    }

    let image = FrameHeader::decode(buf).crc_image();
    let crc = frame_crc(&image, &buf[FRAME_HEADER_SIZE..size]).ok()?;
    (crc == header.crc.get()).then_some(size)
}

fn frame_crc(header_image: &[u8], payload: &[u8]) -> Result<u16> {
    let engine = Crc::new(FRAME_CRC_WIDTH, FRAME_CRC_POLY)?;
    let mut digest = engine.digest(CRC_INIT);
    digest.update(header_image);
    digest.update(payload);
    Ok(digest.finalize() as u16)
}

fn check_buffer_size(size: usize) -> Result<()> {
    if size < FRAME_HEADER_SIZE {
        return Err(FrameError::BufferTooSmall {
            size,
            min: FRAME_HEADER_SIZE,
        });
    }
    if size > FRAME_MAX_SIZE {
        return Err(FrameError::BufferTooLarge {
            size,
            max: FRAME_MAX_SIZE,
        });
    }
    Ok(())
}

fn split_avoid(avoid: &[u8]) -> Result<(&[u8], u8)> {
    match avoid {
        [prefix @ .., last] if !prefix.is_empty() => Ok((prefix, !*last)),
        _ => Err(FrameError::AvoidSequenceTooShort(avoid.len())),
    }
}

/// Start offsets of non-overlapping `needle` matches; after each match the
/// search resumes `skip` bytes past its start.
fn find_all(haystack: &[u8], needle: &[u8], skip: usize) -> Vec<usize> {
    let mut found = Vec::new();
    let mut pos = 0;
    while pos + needle.len() <= haystack.len() {
        match haystack[pos..]
            .windows(needle.len())
            .position(|window| window == needle)
        {
            Some(offset) => {
                found.push(pos + offset);
                pos += offset + skip;
            }
            None => break,
        }
    }
    found
}
