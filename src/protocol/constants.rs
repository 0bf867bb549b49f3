//! Protocol constants for NetBIOS and SMB1
//!
//! Section references are to the CIFS technical reference ([MS-CIFS]).

use std::convert::TryFrom;

/// Well-known NetBIOS session service port
pub const NBT_SESSION_PORT: u16 = 139;

/// Well-known NetBIOS name service port
pub const NBT_NAME_PORT: u16 = 137;

/// SMB1 protocol signature (0xFF 'S' 'M' 'B)
pub const SMB1_MAGIC: [u8; 4] = [0xFF, b'S', b'M', b'B'];

/// Only dialect this client offers
pub const DIALECT_NT_LM_012: &str = "NT LM 0.12";

/// Buffer format byte preceding a dialect string (2.2.1.2)
pub const BUFFER_FORMAT_DIALECT: u8 = 0x02;

/// Buffer format byte preceding a data block (2.2.1.2)
pub const BUFFER_FORMAT_DATA_BLOCK: u8 = 0x01;

/// Buffer format byte preceding an ASCII pathname (2.2.1.2)
pub const BUFFER_FORMAT_ASCII: u8 = 0x04;

/// AndXCommand value meaning "no further commands" (2.2.3.4)
pub const ANDX_NONE: u8 = 0xFF;

/// Dialect index returned by NEGOTIATE when no offered dialect is accepted
pub const NO_DIALECT_ACCEPTED: u16 = 0xFFFF;

/// Server capability: supports NT SMBs such as NT_CREATE_ANDX (2.2.4.52.2)
pub const CAP_NT_SMBS: u32 = 0x0000_0010;

/// Fixed offsets within the 32-byte SMB1 header (2.2.3.1)
pub mod offsets {
    /// Protocol signature, 4 bytes
    pub const PROTOCOL: usize = 0;
    /// Command code
    pub const COMMAND: usize = 4;
    /// Error class, first byte of the SMB_ERROR status
    pub const ERROR_CLASS: usize = 5;
    /// Error code, little-endian u16
    pub const ERROR_CODE: usize = 7;
    pub const FLAGS: usize = 9;
    pub const FLAGS2: usize = 10;
    /// PIDHigh, SecurityFeatures and Reserved, zeroed on requests
    pub const PAD: usize = 12;
    pub const PAD_LEN: usize = 12;
    pub const TID: usize = 24;
    pub const PID: usize = 26;
    pub const UID: usize = 28;
    pub const MID: usize = 30;
    /// WordCount byte that opens the parameter block (2.2.3.2)
    pub const WORD_COUNT: usize = 32;
    /// First parameter word
    pub const PARAMETERS: usize = 33;
}

/// Size of the fixed SMB1 header, not counting the WordCount byte
pub const SMB_HEADER_SIZE: usize = 32;

/// Minimum SMB packet size: header, WordCount and ByteCount
pub const MIN_SMB_SIZE: usize = 35;

/// FLAGS2 value used on every request: long file names allowed
pub const FLAGS2_LONG_NAMES: u16 = 0x0001;

/// Bytes preceding file data in a READ response data block: the buffer
/// format byte (0x01) and a 16-bit data length (2.2.4.11.2)
pub const READ_DATA_SKIP: usize = 3;

/// NetBIOS message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NetBiosMessageType {
    SessionMessage = 0x00,
    SessionRequest = 0x81,
    PositiveResponse = 0x82,
    NegativeResponse = 0x83,
    RetargetResponse = 0x84,
    Keepalive = 0x85,
}

impl TryFrom<u8> for NetBiosMessageType {
    type Error = crate::error::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(NetBiosMessageType::SessionMessage),
            0x81 => Ok(NetBiosMessageType::SessionRequest),
            0x82 => Ok(NetBiosMessageType::PositiveResponse),
            0x83 => Ok(NetBiosMessageType::NegativeResponse),
            0x84 => Ok(NetBiosMessageType::RetargetResponse),
            0x85 => Ok(NetBiosMessageType::Keepalive),
            _ => Err(crate::error::Error::ParseError(format!(
                "Invalid NetBIOS message type: 0x{:02x}",
                value
            ))),
        }
    }
}

/// SMB1 command codes used by this client (2.2.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SmbCommand {
    Open = 0x02,
    Close = 0x04,
    Read = 0x0A,
    OpenAndX = 0x2D,
    Negotiate = 0x72,
    SessionSetupAndX = 0x73,
    TreeConnectAndX = 0x75,
    NtCreateAndX = 0xA2,
}

impl TryFrom<u8> for SmbCommand {
    type Error = crate::error::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x02 => Ok(SmbCommand::Open),
            0x04 => Ok(SmbCommand::Close),
            0x0A => Ok(SmbCommand::Read),
            0x2D => Ok(SmbCommand::OpenAndX),
            0x72 => Ok(SmbCommand::Negotiate),
            0x73 => Ok(SmbCommand::SessionSetupAndX),
            0x75 => Ok(SmbCommand::TreeConnectAndX),
            0xA2 => Ok(SmbCommand::NtCreateAndX),
            _ => Err(crate::error::Error::InvalidHeader(format!(
                "Unsupported SMB command: 0x{:02x}",
                value
            ))),
        }
    }
}
