//! SMB_COM_CLOSE (2.2.4.5)

use super::{SmbReply, SmbRequest};
use crate::error::Result;
use crate::protocol::constants::SmbCommand;
use crate::protocol::message::{SmbRequestBuilder, SmbResponse};

/// LastTimeModified value asking the server to leave the timestamp alone
const TIME_UNCHANGED: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseRequest {
    pub file_id: u16,
}

impl SmbRequest for CloseRequest {
    const COMMAND: SmbCommand = SmbCommand::Close;

    fn write_blocks(&self, builder: &mut SmbRequestBuilder) {
        builder.param_u16(self.file_id).param_u32(TIME_UNCHANGED);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseResponse;

impl SmbReply for CloseResponse {
    fn parse(_response: &SmbResponse) -> Result<Self> {
        Ok(CloseResponse)
    }
}
