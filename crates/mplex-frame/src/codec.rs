use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::frame::{probe, Probe};
use crate::group::{group_header_is_valid, Group};
use crate::header::{
    FrameHeader, GroupHeader, FRAME_HEADER_SIZE, FRAME_MAGIC, FRAME_MAX_SIZE, GROUP_HEADER_SIZE,
    GROUP_MAGIC, GROUP_MAX_SIZE, GROUP_MIN_SIZE,
};

/// Configuration for the group codec.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Largest group accepted or produced, in bytes. Default: 65,535.
    pub max_group_size: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            max_group_size: GROUP_MAX_SIZE,
        }
    }
}

impl GroupConfig {
    /// `max_group_size` clamped to what the protocol allows.
    pub fn limit(&self) -> usize {
        self.max_group_size.clamp(GROUP_MIN_SIZE, GROUP_MAX_SIZE)
    }
}

/// Append the wire image of a finalized group to `dst`.
///
/// The group extent comes from [`Group::calc_group_size`], so unused
/// buffer space is never sent.
pub fn encode_group(group: &Group, dst: &mut BytesMut, max_group_size: usize) -> Result<()> {
    if !group.header_is_valid() {
        return Err(FrameError::InvalidGroupHeader);
    }
    let size = group.calc_group_size();
    if size > max_group_size {
        return Err(FrameError::GroupTooLarge {
            size,
            max: max_group_size,
        });
    }
    dst.reserve(size);
    dst.put_slice(&group.buf()[..size]);
    Ok(())
}

/// Decode the next group from a stream buffer.
///
/// Bytes before a group magic number are discarded, and so is the magic byte
/// of a header whose CRC does not check out. Returns `Ok(None)` while the
/// group is not fully buffered; on success the group bytes are consumed.
pub fn decode_group(src: &mut BytesMut, config: &GroupConfig) -> Result<Option<Group>> {
    let limit = config.limit();
    loop {
        match src.iter().position(|&b| b == GROUP_MAGIC) {
            Some(0) => {}
            Some(skip) => {
                debug!(discarded = skip, "skipping bytes before group magic");
                src.advance(skip);
            }
            None => {
                if !src.is_empty() {
                    debug!(discarded = src.len(), "no group magic in buffer");
                    src.clear();
                }
                return Ok(None);
            }
        }

        if src.len() < GROUP_HEADER_SIZE {
            return Ok(None);
        }
        if !group_header_is_valid(&src[..GROUP_HEADER_SIZE]) {
            debug!("group header CRC mismatch, resynchronizing");
            src.advance(1);
            continue;
        }

        let header = GroupHeader::decode(src);
        let available = src.len().min(limit);
        let Some(size) = group_extent(&src[..available], &header, limit) else {
            return Ok(None);
        };
        let bytes = src.split_to(size);
        return Group::from_bytes(&bytes).map(Some);
    }
}

/// Like [`decode_group`], for the end of a stream: a group that will never
/// be completed is returned truncated instead of waited for.
pub fn decode_group_eof(src: &mut BytesMut, config: &GroupConfig) -> Result<Option<Group>> {
    if let Some(group) = decode_group(src, config)? {
        return Ok(Some(group));
    }
    // Anything left past a full header is an incomplete group with a valid header.
    if src.len() < GROUP_MIN_SIZE {
        if !src.is_empty() {
            debug!(discarded = src.len(), "dropping partial group at end of stream");
            src.clear();
        }
        return Ok(None);
    }
    let size = src.len().min(config.limit());
    debug!(size, "truncated group at end of stream");
    let bytes = src.split_to(size);
    Group::from_bytes(&bytes).map(Some)
}

/// Byte extent of the group at the start of `buf`, or `None` until enough
/// bytes are buffered to tell.
///
/// Frames are scanned the way [`Group::calc_group_size`] scans them, with
/// `limit` standing in for the buffer size; every frame leaves room for the
/// End-Of-Group frame behind it.
fn group_extent(buf: &[u8], header: &GroupHeader, limit: usize) -> Option<usize> {
    let expected = header.num_frames.get() as usize;
    let end = limit - FRAME_HEADER_SIZE;
    let mut found = 0;
    let mut pos = GROUP_HEADER_SIZE;

    while found < expected && pos < end {
        if pos + FRAME_HEADER_SIZE > buf.len() {
            return None;
        }
        if buf[pos] != FRAME_MAGIC {
            pos += 1;
            continue;
        }

        let frame_header = FrameHeader::decode(&buf[pos..]);
        if frame_header.is_end_of_group() {
            break;
        }
        let window = (end - pos).min(FRAME_MAX_SIZE);
        let declared = FRAME_HEADER_SIZE + frame_header.len.get() as usize;
        if declared <= window && pos + declared > buf.len() {
            return None;
        }

        let candidate = &buf[pos..(pos + window).min(buf.len())];
        match probe(candidate) {
            Probe::Valid(size) => {
                found += 1;
                pos += size;
            }
            Probe::EndOfGroup => break,
            Probe::Invalid => pos += 1,
        }
    }

    let size = pos + FRAME_HEADER_SIZE;
    (size <= buf.len()).then_some(size)
}
