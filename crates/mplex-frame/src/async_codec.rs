//! `tokio_util` codec over the group stream format.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_group, decode_group_eof, encode_group, GroupConfig};
use crate::error::FrameError;
use crate::group::Group;

/// Decodes and encodes whole groups for `Framed`, `FramedRead` and
/// `FramedWrite`.
#[derive(Debug, Clone, Default)]
pub struct GroupCodec {
    config: GroupConfig,
}

impl GroupCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GroupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }
}

impl Decoder for GroupCodec {
    type Item = Group;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Group>, FrameError> {
        decode_group(src, &self.config)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Group>, FrameError> {
        decode_group_eof(src, &self.config)
    }
}

impl Encoder<&Group> for GroupCodec {
    type Error = FrameError;

    fn encode(&mut self, group: &Group, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_group(group, dst, self.config.max_group_size)
    }
}

impl Encoder<Group> for GroupCodec {
    type Error = FrameError;

    fn encode(&mut self, group: Group, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_group(&group, dst, self.config.max_group_size)
    }
}
