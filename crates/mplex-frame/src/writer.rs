use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_group, GroupConfig};
use crate::error::{FrameError, Result};
use crate::group::Group;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes finalized groups to any `Write` stream.
pub struct GroupWriter<T> {
    inner: T,
    buf: BytesMut,
    config: GroupConfig,
}

impl<T: Write> GroupWriter<T> {
    /// Create a new group writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, GroupConfig::default())
    }

    /// Create a new group writer with explicit configuration.
    pub fn with_config(inner: T, config: GroupConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete group (blocking).
    ///
    /// The group header must have been finalized with
    /// [`Group::write_header_trailer`].
    pub fn write_group(&mut self, group: &Group) -> Result<()> {
        self.buf.clear();
        encode_group(group, &mut self.buf, self.config.max_group_size)?;
        self.write_buffered()
    }

    /// Write already-encoded group bytes.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.config.max_group_size {
            return Err(FrameError::GroupTooLarge {
                size: bytes.len(),
                max: self.config.max_group_size,
            });
        }
        self.buf.clear();
        self.buf.extend_from_slice(bytes);
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum group size for subsequent encoding.
    pub fn set_max_group_size(&mut self, max_group_size: usize) {
        self.config.max_group_size = max_group_size;
    }

    /// Current group writer configuration.
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }
}
