//! The three SMB1 open commands:
//! SMB_COM_OPEN (2.2.4.3), SMB_COM_OPEN_ANDX (2.2.4.41) and
//! SMB_COM_NT_CREATE_ANDX (2.2.4.64)

use super::{SmbReply, SmbRequest};
use crate::error::Result;
use crate::protocol::constants::{SmbCommand, ANDX_NONE, BUFFER_FORMAT_ASCII};
use crate::protocol::message::{SmbRequestBuilder, SmbResponse};

/// Search attributes sent with legacy opens: include hidden and system files
const SEARCH_HIDDEN_SYSTEM: u16 = 0x0006;

/// SMB_COM_OPEN request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub access_mode: u16,
    pub file_name: String,
}

impl SmbRequest for OpenRequest {
    const COMMAND: SmbCommand = SmbCommand::Open;

    fn write_blocks(&self, builder: &mut SmbRequestBuilder) {
        builder
            .param_u16(self.access_mode)
            .param_u16(SEARCH_HIDDEN_SYSTEM);
        builder
            .data_u8(BUFFER_FORMAT_ASCII)
            .data_cstr(&self.file_name);
    }
}

/// SMB_COM_OPEN_ANDX request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAndXRequest {
    pub access_mode: u16,
    pub file_attributes: u16,
    pub open_function: u16,
    pub file_name: String,
}

impl SmbRequest for OpenAndXRequest {
    const COMMAND: SmbCommand = SmbCommand::OpenAndX;

    fn write_blocks(&self, builder: &mut SmbRequestBuilder) {
        builder
            .param_u8(ANDX_NONE)
            .param_u8(0)
            .param_u16(0) // AndXOffset
            .param_u16(0) // Flags
            .param_u16(self.access_mode)
            .param_u16(SEARCH_HIDDEN_SYSTEM)
            .param_u16(self.file_attributes)
            .param_u32(0) // CreationTime
            .param_u16(self.open_function)
            .param_u32(0) // AllocationSize
            .param_u32(0) // Timeout
            .param_u32(0); // Reserved
        builder.data_cstr(&self.file_name);
    }
}

/// SMB_COM_NT_CREATE_ANDX request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtCreateAndXRequest {
    pub desired_access: u32,
    pub file_attributes: u32,
    pub share_access: u32,
    pub create_disposition: u32,
    pub file_name: String,
}

impl NtCreateAndXRequest {
    const IMPERSONATION_IMPERSONATE: u32 = 2;

    /// NameLength counts the whole FileName field, terminator included
    pub fn name_length(&self) -> u16 {
        (self.file_name.len() + 1) as u16
    }
}

impl SmbRequest for NtCreateAndXRequest {
    const COMMAND: SmbCommand = SmbCommand::NtCreateAndX;

    fn write_blocks(&self, builder: &mut SmbRequestBuilder) {
        builder
            .param_u8(ANDX_NONE)
            .param_u8(0)
            .param_u16(0) // AndXOffset
            .param_u8(0) // Reserved
            .param_u16(self.name_length())
            .param_u32(0) // Flags
            .param_u32(0) // RootDirectoryFID
            .param_u32(self.desired_access)
            .param_u64(0) // AllocationSize
            .param_u32(self.file_attributes)
            .param_u32(self.share_access)
            .param_u32(self.create_disposition)
            .param_u32(0) // CreateOptions
            .param_u32(Self::IMPERSONATION_IMPERSONATE)
            .param_u8(0); // SecurityFlags
        builder.data_cstr(&self.file_name);
    }
}

/// Result common to all three open responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenResponse {
    pub file_id: u16,
    pub file_size: Option<u64>,
}

/// SMB_COM_OPEN response: FID in word 0, DataSize at byte 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyOpenResponse(pub OpenResponse);

impl SmbReply for LegacyOpenResponse {
    fn parse(response: &SmbResponse) -> Result<Self> {
        response.require_words(1)?;
        Ok(Self(OpenResponse {
            file_id: response.word(0)?,
            file_size: response.u32_at(8).ok().map(u64::from),
        }))
    }
}

/// SMB_COM_OPEN_ANDX response: FID in word 2, FileDataSize at byte 12
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenAndXResponse(pub OpenResponse);

impl SmbReply for OpenAndXResponse {
    fn parse(response: &SmbResponse) -> Result<Self> {
        response.require_words(3)?;
        Ok(Self(OpenResponse {
            file_id: response.word(2)?,
            file_size: response.u32_at(12).ok().map(u64::from),
        }))
    }
}

/// SMB_COM_NT_CREATE_ANDX response: FID at byte 5, EndOfFile at byte 55
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtCreateAndXResponse(pub OpenResponse);

impl SmbReply for NtCreateAndXResponse {
    fn parse(response: &SmbResponse) -> Result<Self> {
        response.require_words(4)?;
        Ok(Self(OpenResponse {
            file_id: response.u16_at(5)?,
            file_size: response.u64_at(55).ok(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::{MultiplexCounter, SmbHeader};
    use crate::protocol::messages::test_response;

    fn encode<R: SmbRequest>(request: &R) -> Vec<u8> {
        let header = SmbHeader::request(R::COMMAND, 1, 1, &MultiplexCounter::new());
        let mut builder = SmbRequestBuilder::new(header);
        request.write_blocks(&mut builder);
        builder.build().unwrap()
    }

    #[test]
    fn test_legacy_open_layout() {
        let bytes = encode(&OpenRequest {
            access_mode: 0x0040,
            file_name: "\\docs\\a.txt".to_string(),
        });
        assert_eq!(bytes[4], 0x02);
        assert_eq!(bytes[32], 2);
        assert_eq!(&bytes[33..35], &[0x40, 0x00]);
        // ByteCount covers the format byte, name and NUL
        assert_eq!(&bytes[37..39], &[13, 0]);
        assert_eq!(&bytes[39..], b"\x04\\docs\\a.txt\0");
    }

    #[test]
    fn test_open_andx_layout() {
        let bytes = encode(&OpenAndXRequest {
            access_mode: 0x0040,
            file_attributes: 0,
            open_function: 0x0011,
            file_name: "\\x".to_string(),
        });
        assert_eq!(bytes[4], 0x2D);
        assert_eq!(bytes[32], 15);
        // OpenFunction sits after 8 words and CreationTime
        assert_eq!(&bytes[33 + 16..33 + 18], &[0x11, 0x00]);
        assert_eq!(&bytes[65..], b"\\x\0");
    }

    #[test]
    fn test_nt_create_layout() {
        let bytes = encode(&NtCreateAndXRequest {
            desired_access: 0x8000_0000,
            file_attributes: 0x80,
            share_access: 0x3,
            create_disposition: 1,
            file_name: "\\report.doc".to_string(),
        });
        assert_eq!(bytes[4], 0xA2);
        assert_eq!(bytes[32], 24);
        // NameLength covers the 11 name bytes and the NUL
        assert_eq!(&bytes[38..40], &[12, 0]);
        // DesiredAccess
        assert_eq!(&bytes[48..52], &[0, 0, 0, 0x80]);
        // CreateDisposition
        assert_eq!(&bytes[68..72], &[1, 0, 0, 0]);
        assert_eq!(&bytes[83..], b"\\report.doc\0");
    }

    #[test]
    fn test_legacy_open_response() {
        let response = test_response(SmbCommand::Open, 1, 1, |b| {
            b.param_u16(0x4007)
                .param_u16(0x20)
                .param_u32(0)
                .param_u32(4000)
                .param_u16(0x40);
        });
        let parsed = LegacyOpenResponse::parse(&response).unwrap().0;
        assert_eq!(parsed.file_id, 0x4007);
        assert_eq!(parsed.file_size, Some(4000));
    }

    #[test]
    fn test_nt_create_response() {
        let response = test_response(SmbCommand::NtCreateAndX, 1, 1, |b| {
            b.param_u8(ANDX_NONE)
                .param_u8(0)
                .param_u16(0)
                .param_u8(0) // oplock
                .param_u16(0x1234) // fid
                .param_u32(1) // disposition
                .param_u64(0)
                .param_u64(0)
                .param_u64(0)
                .param_u64(0)
                .param_u32(0x80)
                .param_u64(4096)
                .param_u64(4000) // end of file
                .param_u16(0)
                .param_u16(0)
                .param_u8(0);
        });
        let parsed = NtCreateAndXResponse::parse(&response).unwrap().0;
        assert_eq!(parsed.file_id, 0x1234);
        assert_eq!(parsed.file_size, Some(4000));
    }

    #[test]
    fn test_open_response_without_fid_fails() {
        let response = test_response(SmbCommand::OpenAndX, 1, 1, |b| {
            b.param_u8(ANDX_NONE).param_u8(0);
        });
        assert!(OpenAndXResponse::parse(&response).is_err());
    }
}
