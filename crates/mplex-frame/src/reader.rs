use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_group, decode_group_eof, GroupConfig};
use crate::error::{FrameError, Result};
use crate::group::Group;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete groups from any `Read` stream.
///
/// Handles partial reads and resynchronizes past garbage internally; callers
/// always get whole groups in read mode.
pub struct GroupReader<T> {
    inner: T,
    buf: BytesMut,
    config: GroupConfig,
}

impl<T: Read> GroupReader<T> {
    /// Create a new group reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, GroupConfig::default())
    }

    /// Create a new group reader with explicit configuration.
    pub fn with_config(inner: T, config: GroupConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete group (blocking).
    ///
    /// A group cut short by end of stream is returned as far as it got.
    /// Returns `Err(FrameError::ConnectionClosed)` once nothing is left.
    pub fn read_group(&mut self) -> Result<Group> {
        loop {
            if let Some(group) = decode_group(&mut self.buf, &self.config)? {
                return Ok(group);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return decode_group_eof(&mut self.buf, &self.config)?
                    .ok_or(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum group size for subsequent decoding.
    pub fn set_max_group_size(&mut self, max_group_size: usize) {
        self.config.max_group_size = max_group_size;
    }

    /// Current group reader configuration.
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }
}
