//! SMB_COM_SESSION_SETUP_ANDX, pre-NT LM form (2.2.4.53)
//!
//! Only the null session is supported: the password field is always empty.

use super::{SmbReply, SmbRequest};
use crate::error::Result;
use crate::protocol::constants::{SmbCommand, ANDX_NONE};
use crate::protocol::message::{SmbRequestBuilder, SmbResponse};

/// SESSION_SETUP_ANDX request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSetupRequest {
    pub max_buffer_size: u16,
    pub max_mpx_count: u16,
    pub vc_number: u16,
    pub session_key: u32,
    pub account_name: String,
    pub primary_domain: String,
    pub native_os: String,
    pub native_lanman: String,
}

impl SessionSetupRequest {
    pub fn anonymous(max_buffer_size: u16, native_os: &str, native_lanman: &str) -> Self {
        Self {
            max_buffer_size,
            max_mpx_count: 1,
            vc_number: 0,
            session_key: 0,
            account_name: String::new(),
            primary_domain: String::new(),
            native_os: native_os.to_string(),
            native_lanman: native_lanman.to_string(),
        }
    }
}

impl SmbRequest for SessionSetupRequest {
    const COMMAND: SmbCommand = SmbCommand::SessionSetupAndX;

    fn write_blocks(&self, builder: &mut SmbRequestBuilder) {
        builder
            .param_u8(ANDX_NONE)
            .param_u8(0) // AndXReserved
            .param_u16(0) // AndXOffset
            .param_u16(self.max_buffer_size)
            .param_u16(self.max_mpx_count)
            .param_u16(self.vc_number)
            .param_u32(self.session_key)
            .param_u16(0) // PasswordLength
            .param_u32(0); // Reserved

        builder
            .data_cstr(&self.account_name)
            .data_cstr(&self.primary_domain)
            .data_cstr(&self.native_os)
            .data_cstr(&self.native_lanman);
    }
}

/// SESSION_SETUP_ANDX response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSetupResponse {
    pub user_id: u16,
    /// Server logged the session in as guest
    pub guest: bool,
}

impl SmbReply for SessionSetupResponse {
    fn parse(response: &SmbResponse) -> Result<Self> {
        let action = if response.word_count() >= 3 {
            response.word(2)?
        } else {
            0
        };

        Ok(Self {
            user_id: response.header().user_id,
            guest: action & 0x0001 != 0,
        })
    }
}
