//! SMB_COM_TREE_CONNECT_ANDX (2.2.4.55)

use super::{SmbReply, SmbRequest};
use crate::error::Result;
use crate::protocol::constants::{SmbCommand, ANDX_NONE};
use crate::protocol::message::{SmbRequestBuilder, SmbResponse};

/// TREE_CONNECT_ANDX request for `\\host\share`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConnectRequest {
    pub path: String,
    pub service: String,
}

impl TreeConnectRequest {
    pub fn new(host: &str, share: &str) -> Self {
        Self {
            path: format!("\\\\{}\\{}", host, share),
            service: String::new(),
        }
    }
}

impl SmbRequest for TreeConnectRequest {
    const COMMAND: SmbCommand = SmbCommand::TreeConnectAndX;

    fn write_blocks(&self, builder: &mut SmbRequestBuilder) {
        builder
            .param_u8(ANDX_NONE)
            .param_u8(0)
            .param_u16(0) // AndXOffset
            .param_u16(0) // Flags
            .param_u16(1); // PasswordLength

        builder
            .data_u8(0) // empty password
            .data_cstr(&self.path)
            .data_cstr(&self.service);
    }
}

/// TREE_CONNECT_ANDX response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConnectResponse {
    pub tree_id: u16,
}

impl SmbReply for TreeConnectResponse {
    fn parse(response: &SmbResponse) -> Result<Self> {
        Ok(Self {
            tree_id: response.header().tree_id,
        })
    }
}
