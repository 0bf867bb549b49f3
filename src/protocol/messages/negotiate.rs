//! SMB_COM_NEGOTIATE (2.2.4.52)

use super::{SmbReply, SmbRequest};
use crate::error::{Error, Result};
use crate::protocol::constants::{
    SmbCommand, BUFFER_FORMAT_DIALECT, DIALECT_NT_LM_012, NO_DIALECT_ACCEPTED,
};
use crate::protocol::message::{SmbRequestBuilder, SmbResponse};

/// NEGOTIATE request offering a list of dialect strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiateRequest {
    pub dialects: Vec<String>,
}

impl Default for NegotiateRequest {
    fn default() -> Self {
        Self {
            dialects: vec![DIALECT_NT_LM_012.to_string()],
        }
    }
}

impl SmbRequest for NegotiateRequest {
    const COMMAND: SmbCommand = SmbCommand::Negotiate;

    fn write_blocks(&self, builder: &mut SmbRequestBuilder) {
        for dialect in &self.dialects {
            builder.data_u8(BUFFER_FORMAT_DIALECT).data_cstr(dialect);
        }
    }
}

/// Fields of the NEGOTIATE response this client uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiateResponse {
    pub dialect_index: u16,
    pub security_mode: u8,
    pub max_mpx_count: u16,
    pub max_buffer_size: u32,
    pub capabilities: u32,
}

impl NegotiateResponse {
    /// WordCount of the NT LM 0.12 response form
    pub const NT_WORD_COUNT: usize = 17;
}

impl SmbReply for NegotiateResponse {
    fn parse(response: &SmbResponse) -> Result<Self> {
        response.require_words(1)?;
        let dialect_index = response.word(0)?;
        if dialect_index == NO_DIALECT_ACCEPTED {
            return Err(Error::NoDialectAccepted);
        }

        // Core-protocol servers answer with the index alone
        if response.word_count() < Self::NT_WORD_COUNT {
            return Ok(Self {
                dialect_index,
                security_mode: 0,
                max_mpx_count: 1,
                max_buffer_size: 0,
                capabilities: 0,
            });
        }

        Ok(Self {
            dialect_index,
            security_mode: response.u8_at(2)?,
            max_mpx_count: response.u16_at(3)?,
            max_buffer_size: response.u32_at(7)?,
            capabilities: response.u32_at(19)?,
        })
    }
}
