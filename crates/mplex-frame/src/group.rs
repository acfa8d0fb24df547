use std::time::{SystemTime, UNIX_EPOCH};

use mplex_crc::{Crc, CRC_INIT};
use tracing::trace;

use crate::bitint::{HeaderCrc, HeaderLen, NumFrames};
use crate::error::{FrameError, Result};
use crate::frame::{probe, Frame, Mode, Probe};
use crate::header::{
    GroupHeader, END_OF_GROUP_BYTES, FRAME_HEADER_SIZE, FRAME_MAGIC, FRAME_MAX_SIZE,
    GROUP_CRC_POLY, GROUP_CRC_WIDTH, GROUP_HEADER_SIZE, GROUP_MAGIC, GROUP_MAX_SIZE,
    GROUP_MIN_SIZE, GROUP_VERSION, MAX_FRAMES,
};

/// An owned buffer holding a group header, a run of frames and the
/// End-Of-Group frame.
///
/// A group is either being written (frames are filled through
/// [`curr_frame`](Self::curr_frame) and appended with
/// [`commit_frame`](Self::commit_frame)) or being read (frames are found
/// with [`next_valid_frame`](Self::next_valid_frame), skipping anything
/// corrupted on the way).
#[derive(Debug, Clone)]
pub struct Group {
    buf: Vec<u8>,
    header: GroupHeader,
    frame_pos: usize,
    /// Size of the frame at `frame_pos` as validated when it was found.
    frame_size: Option<usize>,
    frames_committed: NumFrames,
    mode: Mode,
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl Group {
    /// Empty group in write mode with the largest possible buffer.
    pub fn new() -> Self {
        Self::empty(GROUP_MAX_SIZE)
    }

    /// Empty group in write mode with a `size`-byte buffer.
    pub fn with_capacity(size: usize) -> Result<Self> {
        check_group_size(size)?;
        Ok(Self::empty(size))
    }

    /// Load a serialized group for reading. The bytes are copied.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_group_size(bytes.len())?;
        Ok(Self {
            buf: bytes.to_vec(),
            header: GroupHeader::decode(bytes),
            frame_pos: GROUP_HEADER_SIZE,
            frame_size: None,
            frames_committed: NumFrames::default(),
            mode: Mode::Read,
        })
    }

    fn empty(size: usize) -> Self {
        Self {
            buf: vec![0; size],
            header: GroupHeader::default(),
            frame_pos: GROUP_HEADER_SIZE,
            frame_size: None,
            frames_committed: NumFrames::default(),
            mode: Mode::Write,
        }
    }

    /// Start over as an empty write-mode group, keeping the buffer size.
    pub fn reset(&mut self) {
        self.buf.fill(0);
        self.header = GroupHeader::default();
        self.frame_pos = GROUP_HEADER_SIZE;
        self.frame_size = None;
        self.frames_committed = NumFrames::default();
        self.mode = Mode::Write;
    }

    /// A fresh view of the frame at the current position.
    ///
    /// While writing, the view always leaves room for the End-Of-Group frame
    /// behind it. While reading, the extent of a valid frame is recorded so
    /// the next scan steps over it even if the view is destuffed in place.
    pub fn curr_frame(&mut self) -> Result<Frame<'_>> {
        let window = self.frame_window(self.frame_pos);
        if window < FRAME_HEADER_SIZE {
            return Err(FrameError::GroupFull {
                frames: self.frames_committed.get() as usize,
                remaining: self.remaining(),
            });
        }
        if self.mode == Mode::Read && self.frame_size.is_none() {
            if let Probe::Valid(size) = self.probe_at(self.frame_pos, window) {
                self.frame_size = Some(size);
            }
        }
        let start = self.frame_pos;
        Frame::new(&mut self.buf[start..start + window], self.mode)
    }

    /// Append the current frame to the group.
    ///
    /// The frame must have been finalized with
    /// [`Frame::write_header`]. Returns the view for the next frame, or
    /// `None` once there is no room left for another one.
    pub fn commit_frame(&mut self) -> Result<Option<Frame<'_>>> {
        self.require_write("commit_frame")?;
        let committed = self.frames_committed.get() as usize;
        if committed >= MAX_FRAMES {
            return Err(FrameError::GroupFull {
                frames: committed,
                remaining: self.remaining(),
            });
        }

        let window = self.frame_window(self.frame_pos);
        let size = match self.probe_at(self.frame_pos, window) {
            Probe::Valid(size) => size,
            _ => return Err(FrameError::InvalidFrame),
        };

        self.frame_pos += size;
        self.frames_committed = self.frames_committed.wrapping_add(1);
        trace!(
            frames = self.frames_committed.get(),
            size,
            offset = self.frame_pos,
            "committed frame"
        );

        if self.frames_committed.is_max()
            || self.frame_window(self.frame_pos) < FRAME_HEADER_SIZE
        {
            return Ok(None);
        }
        self.curr_frame().map(Some)
    }

    /// Move past the current frame and return the next valid one.
    ///
    /// Corrupted bytes are skipped one at a time until a frame magic byte
    /// starts a frame whose CRC checks out. Returns `None` at the End-Of-Group
    /// frame (and keeps returning `None` from there) or at the end of the
    /// buffer.
    pub fn next_valid_frame(&mut self) -> Result<Option<Frame<'_>>> {
        self.require_read("next_valid_frame")?;

        let len = self.buf.len();
        let step = match self.frame_size.take() {
            Some(size) => size,
            None => match self.probe_at(self.frame_pos, self.frame_window(self.frame_pos)) {
                Probe::EndOfGroup => return Ok(None),
                Probe::Valid(size) => size,
                Probe::Invalid => 1,
            },
        };
        let start = (self.frame_pos + step).min(len);

        for pos in start..len {
            if self.buf[pos] != FRAME_MAGIC {
                continue;
            }
            let window = self.frame_window(pos);
            if window < FRAME_HEADER_SIZE {
                self.frame_pos = pos;
                return Ok(None);
            }
            match self.probe_at(pos, window) {
                Probe::EndOfGroup => {
                    self.frame_pos = pos;
                    return Ok(None);
                }
                Probe::Valid(size) => {
                    if pos != start {
                        trace!(skipped = pos - start, offset = pos, "resynchronized");
                    }
                    self.frame_pos = pos;
                    self.frame_size = Some(size);
                    return Frame::new(&mut self.buf[pos..pos + window], self.mode).map(Some);
                }
                Probe::Invalid => {}
            }
        }

        self.frame_pos = len;
        Ok(None)
    }

    /// Write the End-Of-Group frame at the current position and finalize the
    /// group header with the current wall-clock time.
    ///
    /// The position does not move, so more frames can still be written and
    /// the trailer rewritten afterwards.
    pub fn write_header_trailer(&mut self) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.write_header_trailer_at(now.as_secs() as u32, now.subsec_nanos())
    }

    /// Like [`write_header_trailer`](Self::write_header_trailer) with a
    /// caller-supplied timestamp.
    pub fn write_header_trailer_at(&mut self, sec: u32, nsec: u32) -> Result<()> {
        self.require_write("write_header_trailer")?;
        let end = self.frame_pos + FRAME_HEADER_SIZE;
        if end > self.buf.len() {
            return Err(FrameError::OutOfSpace {
                needed: FRAME_HEADER_SIZE,
                available: self.remaining(),
            });
        }

        let mut header = GroupHeader {
            magic: GROUP_MAGIC,
            vers: GROUP_VERSION,
            timestamp_sec: sec,
            timestamp_nsec: nsec,
            num_frames: self.frames_committed,
            header_len: HeaderLen::masked(GROUP_HEADER_SIZE as u64),
            hcrc: HeaderCrc::default(),
        };
        header.hcrc = HeaderCrc::masked(group_crc(&header.crc_image())?);

        self.buf[self.frame_pos..end].copy_from_slice(&END_OF_GROUP_BYTES);
        self.buf[..GROUP_HEADER_SIZE].copy_from_slice(&header.encode());
        self.header = header;
        trace!(
            frames = header.num_frames.get(),
            size = self.processed_size(),
            "finalized group"
        );
        Ok(())
    }

    /// True when the magic number matches and the header CRC checks out.
    pub fn header_is_valid(&self) -> bool {
        let image = GroupHeader::decode(&self.buf).crc_image();
        self.header.magic == GROUP_MAGIC
            && group_crc(&image).is_ok_and(|crc| crc == self.header.hcrc.to_u64())
    }

    /// Size of the group up to and including its End-Of-Group frame, found by
    /// scanning the buffer. 0 if the header is not valid.
    ///
    /// The scan stops at the End-Of-Group frame, after as many valid frames
    /// as the header announces, or one frame header before the end of the
    /// buffer. Corruption can make the result smaller than the real group,
    /// never larger.
    pub fn calc_group_size(&self) -> usize {
        if !self.header_is_valid() {
            return 0;
        }

        let limit = self.buf.len() - FRAME_HEADER_SIZE;
        let expected = self.header.num_frames.get() as usize;
        let mut found = 0;
        let mut pos = GROUP_HEADER_SIZE;
        while found < expected && pos < limit {
            if self.buf[pos] != FRAME_MAGIC {
                pos += 1;
                continue;
            }
            let window = (self.buf.len() - pos).min(FRAME_MAX_SIZE);
            match probe(&self.buf[pos..pos + window]) {
                Probe::EndOfGroup => break,
                Probe::Valid(size) => {
                    found += 1;
                    pos += size;
                }
                Probe::Invalid => pos += 1,
            }
        }
        (pos + FRAME_HEADER_SIZE).min(self.buf.len())
    }

    /// Bytes up to the current frame, plus the End-Of-Group frame.
    pub fn processed_size(&self) -> usize {
        self.frame_pos + FRAME_HEADER_SIZE
    }

    /// The whole underlying buffer.
    pub fn buf(&self) -> &[u8] {
        &self.buf
    }

    /// The bytes a finalized write-mode group puts on the wire.
    pub fn wire_bytes(&self) -> &[u8] {
        &self.buf[..self.processed_size().min(self.buf.len())]
    }

    pub fn header(&self) -> &GroupHeader {
        &self.header
    }

    /// Frame count announced by the header.
    pub fn num_frames(&self) -> u16 {
        self.header.num_frames.get()
    }

    pub fn header_len(&self) -> u8 {
        self.header.header_len.get()
    }

    pub fn hcrc(&self) -> u8 {
        self.header.hcrc.get()
    }

    /// Header timestamp as `(seconds, nanoseconds)`.
    pub fn timestamp(&self) -> (u32, u32) {
        (self.header.timestamp_sec, self.header.timestamp_nsec)
    }

    pub fn version(&self) -> u8 {
        self.header.vers
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Frames committed so far in write mode.
    pub fn frames_committed(&self) -> u16 {
        self.frames_committed.get()
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.frame_pos)
    }

    /// Size of the frame view at `pos`.
    fn frame_window(&self, pos: usize) -> usize {
        let remaining = self.buf.len().saturating_sub(pos);
        let usable = if self.mode.can_write() {
            remaining.saturating_sub(FRAME_HEADER_SIZE)
        } else {
            remaining
        };
        usable.min(FRAME_MAX_SIZE)
    }

    fn probe_at(&self, pos: usize, window: usize) -> Probe {
        if window < FRAME_HEADER_SIZE {
            return Probe::Invalid;
        }
        probe(&self.buf[pos..pos + window])
    }

    fn require_read(&self, op: &'static str) -> Result<()> {
        if self.mode == Mode::Read {
            Ok(())
        } else {
            Err(FrameError::ModeNotPermitted {
                op,
                mode: self.mode,
            })
        }
    }

    fn require_write(&self, op: &'static str) -> Result<()> {
        if self.mode == Mode::Write {
            Ok(())
        } else {
            Err(FrameError::ModeNotPermitted {
                op,
                mode: self.mode,
            })
        }
    }
}

/// Header check on raw bytes, before a [`Group`] exists.
pub(crate) fn group_header_is_valid(bytes: &[u8]) -> bool {
    let header = GroupHeader::decode(bytes);
    header.magic == GROUP_MAGIC
        && group_crc(&header.crc_image()).is_ok_and(|crc| crc == header.hcrc.to_u64())
}

fn group_crc(image: &[u8]) -> Result<u64> {
    Ok(Crc::new(GROUP_CRC_WIDTH, GROUP_CRC_POLY)?.checksum(image, CRC_INIT))
}

fn check_group_size(size: usize) -> Result<()> {
    if (GROUP_MIN_SIZE..=GROUP_MAX_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(FrameError::GroupSizeOutOfRange {
            size,
            min: GROUP_MIN_SIZE,
            max: GROUP_MAX_SIZE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a finalized group from `(id, payload)` pairs.
    fn build(frames: &[(u8, &[u8])]) -> Group {
        let mut group = Group::new();
        for (id, payload) in frames {
            let mut frame = group.curr_frame().unwrap();
            frame.write_bytes(payload).unwrap();
            frame.write_header(*id).unwrap();
            group.commit_frame().unwrap();
        }
        group.write_header_trailer_at(1_700_000_000, 42).unwrap();
        group
    }

    fn read_all(group: &mut Group) -> Vec<(u8, Vec<u8>)> {
        let mut out = Vec::new();
        {
            let frame = group.curr_frame().unwrap();
            if frame.is_valid() {
                out.push((frame.id(), frame.payload().unwrap().to_vec()));
            }
        }
        while let Some(frame) = group.next_valid_frame().unwrap() {
            out.push((frame.id(), frame.payload().unwrap().to_vec()));
        }
        out
    }

    const FRAMES: [(u8, &[u8]); 4] = [
        (1, b"first"),
        (2, b"second frame"),
        (3, b""),
        (126, b"last one"),
    ];

    #[test]
    fn new_group_is_empty() {
        let group = Group::new();
        assert_eq!(group.mode(), Mode::Write);
        assert_eq!(group.buf().len(), GROUP_MAX_SIZE);
        assert_eq!(group.processed_size(), GROUP_MIN_SIZE);
        assert_eq!(group.frames_committed(), 0);
        assert!(!group.header_is_valid());
        assert_eq!(group.calc_group_size(), 0);
    }

    #[test]
    fn accounting_matches_layout() {
        let group = build(&FRAMES);
        let payload_bytes: usize = FRAMES.iter().map(|(_, p)| p.len()).sum();
        let expected = GROUP_HEADER_SIZE + FRAMES.len() * FRAME_HEADER_SIZE + payload_bytes
            + FRAME_HEADER_SIZE;

        assert!(group.header_is_valid());
        assert_eq!(group.num_frames(), 4);
        assert_eq!(group.frames_committed(), 4);
        assert_eq!(group.header_len(), 13);
        assert_eq!(group.version(), GROUP_VERSION);
        assert_eq!(group.timestamp(), (1_700_000_000, 42));
        assert_eq!(group.processed_size(), expected);
        assert_eq!(group.calc_group_size(), expected);
        assert_eq!(group.wire_bytes().len(), expected);
        assert_eq!(group.wire_bytes()[expected - 5..], END_OF_GROUP_BYTES);
    }

    #[test]
    fn empty_group_is_header_and_trailer() {
        let mut group = Group::new();
        group.write_header_trailer().unwrap();
        assert!(group.header_is_valid());
        assert_eq!(group.num_frames(), 0);
        assert_eq!(group.calc_group_size(), GROUP_MIN_SIZE);
        assert!(group.timestamp().0 > 0);

        let mut read = Group::from_bytes(group.wire_bytes()).unwrap();
        assert!(read.next_valid_frame().unwrap().is_none());
    }

    #[test]
    fn read_back_every_frame() {
        let written = build(&FRAMES);
        let mut group = Group::from_bytes(written.wire_bytes()).unwrap();
        assert_eq!(group.mode(), Mode::Read);
        assert!(group.header_is_valid());
        assert_eq!(group.num_frames(), 4);

        let frames = read_all(&mut group);
        let expected: Vec<(u8, Vec<u8>)> =
            FRAMES.iter().map(|(id, p)| (*id, p.to_vec())).collect();
        assert_eq!(frames, expected);

        // Parked on the End-Of-Group frame.
        assert!(group.next_valid_frame().unwrap().is_none());
        assert!(group.next_valid_frame().unwrap().is_none());
        assert!(group.curr_frame().unwrap().is_end_of_group());
    }

    #[test]
    fn corrupted_frame_is_skipped() {
        let written = build(&FRAMES);
        let mut bytes = written.wire_bytes().to_vec();
        // First payload byte of frame 1.
        let offset = GROUP_HEADER_SIZE + FRAME_HEADER_SIZE + FRAMES[0].1.len() + FRAME_HEADER_SIZE;
        bytes[offset] ^= 0x01;

        let mut group = Group::from_bytes(&bytes).unwrap();
        assert!(group.header_is_valid());
        let ids: Vec<u8> = read_all(&mut group).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, [1, 3, 126]);

        // One frame short of the announced count, so the scan runs to the trailer.
        let group = Group::from_bytes(&bytes).unwrap();
        assert_eq!(group.calc_group_size(), bytes.len());
    }

    #[test]
    fn corrupted_first_frame_is_skipped() {
        let written = build(&FRAMES);
        let mut bytes = written.wire_bytes().to_vec();
        bytes[GROUP_HEADER_SIZE + FRAME_HEADER_SIZE] ^= 0x80;

        let mut group = Group::from_bytes(&bytes).unwrap();
        assert!(!group.curr_frame().unwrap().is_valid());
        let first = group.next_valid_frame().unwrap().unwrap();
        assert_eq!(first.id(), 2);
    }

    #[test]
    fn garbage_between_frames_is_skipped() {
        let written = build(&FRAMES[..2]);
        let mut bytes = written.wire_bytes().to_vec();
        let split = GROUP_HEADER_SIZE + FRAME_HEADER_SIZE + FRAMES[0].1.len();
        for (i, byte) in [FRAME_MAGIC, 0x00, FRAME_MAGIC, FRAME_MAGIC, 0x12].iter().enumerate() {
            bytes.insert(split + i, *byte);
        }

        let mut group = Group::from_bytes(&bytes).unwrap();
        let ids: Vec<u8> = read_all(&mut group).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn missing_trailer_scan_stops_at_frame_count() {
        let written = build(&FRAMES[..2]);
        let size = written.calc_group_size();
        let mut bytes = written.wire_bytes().to_vec();
        bytes.truncate(size - FRAME_HEADER_SIZE);
        bytes.extend_from_slice(&[0x55; 10]);

        let group = Group::from_bytes(&bytes).unwrap();
        assert_eq!(group.calc_group_size(), size);
    }

    #[test]
    fn corrupt_header_invalidates_group() {
        let written = build(&FRAMES);
        let mut bytes = written.wire_bytes().to_vec();
        bytes[3] ^= 0x10;
        let group = Group::from_bytes(&bytes).unwrap();
        assert!(!group.header_is_valid());
        assert_eq!(group.calc_group_size(), 0);
    }

    #[test]
    fn mode_restrictions() {
        let mut writer = Group::new();
        assert!(matches!(
            writer.next_valid_frame(),
            Err(FrameError::ModeNotPermitted {
                op: "next_valid_frame",
                ..
            })
        ));

        let written = build(&FRAMES);
        let mut reader = Group::from_bytes(written.wire_bytes()).unwrap();
        assert!(matches!(
            reader.commit_frame(),
            Err(FrameError::ModeNotPermitted { op: "commit_frame", .. })
        ));
        assert!(matches!(
            reader.write_header_trailer(),
            Err(FrameError::ModeNotPermitted { .. })
        ));
        assert!(reader.curr_frame().unwrap().write_data(1u8).is_err());
    }

    #[test]
    fn commit_requires_valid_frame() {
        let mut group = Group::new();
        {
            let mut frame = group.curr_frame().unwrap();
            frame.write_data(7u32).unwrap();
        }
        assert!(matches!(group.commit_frame(), Err(FrameError::InvalidFrame)));
        assert_eq!(group.frames_committed(), 0);
        assert_eq!(group.processed_size(), GROUP_MIN_SIZE);
    }

    #[test]
    fn commit_returns_none_when_full() {
        let mut group = Group::with_capacity(GROUP_MIN_SIZE + FRAME_HEADER_SIZE).unwrap();
        {
            let mut frame = group.curr_frame().unwrap();
            assert_eq!(frame.remaining(), 0);
            frame.write_header(9).unwrap();
        }
        assert!(group.commit_frame().unwrap().is_none());
        assert!(matches!(group.curr_frame(), Err(FrameError::GroupFull { frames: 1, .. })));

        group.write_header_trailer_at(0, 0).unwrap();
        assert_eq!(group.calc_group_size(), GROUP_MIN_SIZE + FRAME_HEADER_SIZE);
        assert_eq!(group.wire_bytes().len(), group.buf().len());
    }

    #[test]
    fn minimum_group_holds_only_trailer() {
        let mut group = Group::with_capacity(GROUP_MIN_SIZE).unwrap();
        assert!(matches!(group.curr_frame(), Err(FrameError::GroupFull { .. })));
        group.write_header_trailer_at(5, 6).unwrap();
        assert_eq!(group.calc_group_size(), GROUP_MIN_SIZE);
    }

    #[test]
    fn frame_views_never_exceed_frame_size() {
        let mut group = Group::new();
        let frame = group.curr_frame().unwrap();
        assert_eq!(frame.buf().len(), FRAME_MAX_SIZE);
    }

    #[test]
    fn commit_stops_at_max_frames() {
        let mut group = Group::new();
        let mut last = None;
        for _ in 0..MAX_FRAMES {
            let mut frame = group.curr_frame().unwrap();
            frame.write_header(0).unwrap();
            last = Some(group.commit_frame().unwrap().is_some());
        }
        assert_eq!(last, Some(false));
        assert_eq!(group.frames_committed() as usize, MAX_FRAMES);
        assert!(matches!(group.commit_frame(), Err(FrameError::GroupFull { .. })));

        group.write_header_trailer_at(0, 0).unwrap();
        assert_eq!(group.num_frames() as usize, MAX_FRAMES);
        assert_eq!(
            group.calc_group_size(),
            GROUP_HEADER_SIZE + (MAX_FRAMES + 1) * FRAME_HEADER_SIZE
        );
    }

    #[test]
    fn size_bounds() {
        assert!(matches!(
            Group::with_capacity(GROUP_MIN_SIZE - 1),
            Err(FrameError::GroupSizeOutOfRange { size: 17, .. })
        ));
        assert!(Group::with_capacity(GROUP_MAX_SIZE + 1).is_err());
        assert!(Group::from_bytes(&[0u8; 10]).is_err());
        assert!(Group::from_bytes(&vec![0u8; GROUP_MAX_SIZE + 1]).is_err());
    }

    #[test]
    fn reset_clears_everything() {
        let mut group = build(&FRAMES);
        group.reset();
        assert_eq!(group.mode(), Mode::Write);
        assert_eq!(group.frames_committed(), 0);
        assert_eq!(group.processed_size(), GROUP_MIN_SIZE);
        assert_eq!(group.num_frames(), 0);
        assert!(!group.header_is_valid());
        assert!(group.buf().iter().all(|&b| b == 0));

        let mut reader = Group::from_bytes(build(&FRAMES).wire_bytes()).unwrap();
        reader.reset();
        assert_eq!(reader.mode(), Mode::Write);
        assert!(reader.curr_frame().is_ok());
    }

    #[test]
    fn trailer_can_be_rewritten() {
        let mut group = build(&FRAMES[..1]);
        let first_size = group.calc_group_size();
        {
            let mut frame = group.curr_frame().unwrap();
            frame.write_bytes(b"late").unwrap();
            frame.write_header(5).unwrap();
        }
        group.commit_frame().unwrap();
        group.write_header_trailer_at(0, 0).unwrap();
        assert_eq!(group.num_frames(), 2);
        assert_eq!(group.calc_group_size(), first_size + FRAME_HEADER_SIZE + 4);
    }

    #[test]
    fn destuffed_frame_does_not_derail_scan() {
        let avoid = END_OF_GROUP_BYTES;
        let mut group = Group::new();
        let payloads: [&[u8]; 3] = [b"x", &END_OF_GROUP_BYTES, b"after"];
        for (id, payload) in payloads.iter().enumerate() {
            let mut frame = group.curr_frame().unwrap();
            frame.write_bytes(payload).unwrap();
            frame.byte_stuff(&avoid).unwrap();
            frame.write_header(id as u8).unwrap();
            group.commit_frame().unwrap();
        }
        group.write_header_trailer_at(0, 0).unwrap();

        let mut reader = Group::from_bytes(group.wire_bytes()).unwrap();
        assert_eq!(reader.curr_frame().unwrap().id(), 0);

        let mut second = reader.next_valid_frame().unwrap().unwrap();
        assert_eq!(second.id(), 1);
        assert_eq!(second.byte_destuff(&avoid).unwrap(), 1);
        assert_eq!(second.payload().unwrap(), END_OF_GROUP_BYTES);

        // The destuffed payload now holds an End-Of-Group image.
        let third = reader.next_valid_frame().unwrap().unwrap();
        assert_eq!(third.id(), 2);
        assert!(reader.next_valid_frame().unwrap().is_none());
    }

    #[test]
    fn destuffed_first_frame_does_not_derail_scan() {
        let avoid = END_OF_GROUP_BYTES;
        let mut group = Group::new();
        let payloads: [&[u8]; 2] = [&END_OF_GROUP_BYTES, b"after"];
        for (id, payload) in payloads.iter().enumerate() {
            let mut frame = group.curr_frame().unwrap();
            frame.write_bytes(payload).unwrap();
            frame.byte_stuff(&avoid).unwrap();
            frame.write_header(id as u8).unwrap();
            group.commit_frame().unwrap();
        }
        group.write_header_trailer_at(0, 0).unwrap();

        let mut reader = Group::from_bytes(group.wire_bytes()).unwrap();
        {
            let mut first = reader.curr_frame().unwrap();
            assert_eq!(first.id(), 0);
            assert_eq!(first.byte_destuff(&avoid).unwrap(), 1);
            assert_eq!(first.payload().unwrap(), END_OF_GROUP_BYTES);
        }
        // Asking again must not forget the extent found the first time.
        assert!(!reader.curr_frame().unwrap().is_valid());

        let next = reader.next_valid_frame().unwrap().unwrap();
        assert_eq!(next.id(), 1);
        assert_eq!(next.payload().unwrap(), b"after");
        assert!(reader.next_valid_frame().unwrap().is_none());
    }
}
