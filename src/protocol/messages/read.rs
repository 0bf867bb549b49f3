//! SMB_COM_READ (2.2.4.11)

use super::{SmbReply, SmbRequest};
use crate::error::{Error, Result};
use crate::protocol::constants::{
    SmbCommand, BUFFER_FORMAT_DATA_BLOCK, READ_DATA_SKIP, SMB_HEADER_SIZE,
};
use crate::protocol::message::{SmbRequestBuilder, SmbResponse};
use bytes::Bytes;

/// READ response length minus the file data: header, WordCount, five
/// parameter words, ByteCount and the data block prefix
pub const READ_RESPONSE_OVERHEAD: usize = SMB_HEADER_SIZE + 1 + 10 + 2 + READ_DATA_SKIP;

/// READ request for `count` bytes at a 32-bit `offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub file_id: u16,
    pub count: u16,
    pub offset: u32,
}

impl SmbRequest for ReadRequest {
    const COMMAND: SmbCommand = SmbCommand::Read;

    fn write_blocks(&self, builder: &mut SmbRequestBuilder) {
        builder
            .param_u16(self.file_id)
            .param_u16(self.count)
            .param_u32(self.offset)
            .param_u16(0); // EstimateOfRemainingBytes
    }
}

/// READ response payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub data: Bytes,
}

impl SmbReply for ReadResponse {
    /// The data block is `0x01`, a 16-bit length, then the file bytes, so
    /// ByteCount is always the payload length plus [`READ_DATA_SKIP`].
    fn parse(response: &SmbResponse) -> Result<Self> {
        let block = response.data();
        if block.is_empty() {
            return Ok(Self { data: Bytes::new() });
        }
        if block.len() < READ_DATA_SKIP {
            return Err(Error::ParseError(format!(
                "READ data block of {} bytes is shorter than its {} byte prefix",
                block.len(),
                READ_DATA_SKIP
            )));
        }
        if block[0] != BUFFER_FORMAT_DATA_BLOCK {
            return Err(Error::ParseError(format!(
                "READ data block has buffer format 0x{:02x}",
                block[0]
            )));
        }

        Ok(Self {
            data: Bytes::copy_from_slice(&block[READ_DATA_SKIP..]),
        })
    }
}
