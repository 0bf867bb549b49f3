//! Error types for the CIFS client

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for CIFS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CIFS client operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Name resolution failed (broadcast query and DNS fallback)
    #[error("Name resolution failed: {0}")]
    Resolution(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Remote end rejected the NetBIOS session request
    #[error("NetBIOS session request rejected: {0}")]
    SessionRejected(String),

    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Timeout occurred
    #[error("Operation timed out")]
    Timeout,

    /// Server answered with a non-zero SMB error class
    #[error("SMB error: {class} (code 0x{code:04X})")]
    Smb { class: SmbErrorClass, code: u16 },

    /// NEGOTIATE completed but none of the offered dialects was accepted
    #[error("Server accepted none of the offered dialects")]
    NoDialectAccepted,

    /// Protocol parsing error
    #[error("Protocol parsing error: {0}")]
    ParseError(String),

    /// Invalid SMB header
    #[error("Invalid SMB header: {0}")]
    InvalidHeader(String),

    /// Buffer too small
    #[error("Buffer too small: need {need} bytes, have {have}")]
    BufferTooSmall { need: usize, have: usize },

    /// Message does not fit the wire format limits
    #[error("Message too large: {0}")]
    MessageTooLarge(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed UNC path
    #[error("Invalid UNC path: {0}")]
    InvalidPath(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unknown or released file handle
    #[error("Invalid handle: {0}")]
    InvalidHandle(u32),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Build an error from the status fields of an SMB1 response header.
    pub fn from_status(class: u8, code: u16) -> Self {
        Error::Smb {
            class: SmbErrorClass::from(class),
            code,
        }
    }
}

/// SMB1 error classes (CIFS section 2.2.2.4, SMB_ERROR)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmbErrorClass {
    /// The operation completed successfully
    Success,
    /// ERRDOS: error generated by the server operating system
    Dos,
    /// ERRSRV: error generated by the server network file manager
    Server,
    /// ERRHRD: hardware error
    Hardware,
    /// ERRCMD: command was not in SMB format
    Command,
    /// Any other class value
    Unknown(u8),
}

impl From<u8> for SmbErrorClass {
    fn from(value: u8) -> Self {
        match value {
            0x00 => SmbErrorClass::Success,
            0x01 => SmbErrorClass::Dos,
            0x02 => SmbErrorClass::Server,
            0x03 => SmbErrorClass::Hardware,
            0xFF => SmbErrorClass::Command,
            other => SmbErrorClass::Unknown(other),
        }
    }
}

impl SmbErrorClass {
    pub fn is_success(self) -> bool {
        self == SmbErrorClass::Success
    }

    /// Raw class byte as it appears on the wire
    pub fn as_u8(self) -> u8 {
        match self {
            SmbErrorClass::Success => 0x00,
            SmbErrorClass::Dos => 0x01,
            SmbErrorClass::Server => 0x02,
            SmbErrorClass::Hardware => 0x03,
            SmbErrorClass::Command => 0xFF,
            SmbErrorClass::Unknown(v) => v,
        }
    }
}

impl fmt::Display for SmbErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SmbErrorClass::Success => "Success",
            SmbErrorClass::Dos => "ERRDOS",
            SmbErrorClass::Server => "ERRSRV",
            SmbErrorClass::Hardware => "ERRHRD",
            SmbErrorClass::Command => "ERRCMD",
            SmbErrorClass::Unknown(_) => "Unknown class",
        };
        write!(f, "{} (0x{:02X})", msg, self.as_u8())
    }
}

/// Well-known ERRDOS codes
pub mod dos_codes {
    pub const ERR_BAD_FUNC: u16 = 1;
    pub const ERR_BAD_FILE: u16 = 2;
    pub const ERR_BAD_PATH: u16 = 3;
    pub const ERR_NO_FIDS: u16 = 4;
    pub const ERR_NO_ACCESS: u16 = 5;
    pub const ERR_BAD_FID: u16 = 6;
    pub const ERR_BAD_SHARE: u16 = 32;
    pub const ERR_FILE_EXISTS: u16 = 80;
    pub const ERR_MORE_DATA: u16 = 234;
}

/// Well-known ERRSRV codes
pub mod srv_codes {
    pub const ERR_ERROR: u16 = 1;
    pub const ERR_BAD_PW: u16 = 2;
    pub const ERR_ACCESS: u16 = 4;
    pub const ERR_INV_TID: u16 = 5;
    pub const ERR_INV_NET_NAME: u16 = 6;
    pub const ERR_BAD_UID: u16 = 91;
}
