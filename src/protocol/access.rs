//! Win32-style access, sharing and creation arguments and their SMB1 encodings

use crate::error::{Error, Result};
use bitflags::bitflags;

bitflags! {
    /// Requested access rights
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DesiredAccess: u32 {
        const FILE_READ_DATA       = 0x00000001;
        const FILE_READ_ATTRIBUTES = 0x00000080;
        const SYNCHRONIZE          = 0x00100000;
        const GENERIC_ALL          = 0x10000000;
        const GENERIC_EXECUTE      = 0x20000000;
        const GENERIC_WRITE        = 0x40000000;
        const GENERIC_READ         = 0x80000000;
    }
}

bitflags! {
    /// File share access rights
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShareAccess: u32 {
        const FILE_SHARE_READ   = 0x00000001;
        const FILE_SHARE_WRITE  = 0x00000002;
        const FILE_SHARE_DELETE = 0x00000004;
    }
}

bitflags! {
    /// File attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileAttributes: u32 {
        const READONLY  = 0x00000001;
        const HIDDEN    = 0x00000002;
        const SYSTEM    = 0x00000004;
        const DIRECTORY = 0x00000010;
        const ARCHIVE   = 0x00000020;
        const NORMAL    = 0x00000080;
    }
}

/// Win32 creation disposition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CreationDisposition {
    CreateNew = 1,
    CreateAlways = 2,
    OpenExisting = 3,
    OpenAlways = 4,
    TruncateExisting = 5,
}

impl CreationDisposition {
    /// Whether the disposition may create a file that does not exist
    pub fn may_create(self) -> bool {
        matches!(
            self,
            CreationDisposition::CreateNew
                | CreationDisposition::CreateAlways
                | CreationDisposition::OpenAlways
        )
    }

    /// OpenFunction word of OPEN_ANDX (2.2.4.41.1)
    pub fn open_function(self) -> u16 {
        const FAIL_IF_EXISTS: u16 = 0x0000;
        const OPEN_IF_EXISTS: u16 = 0x0001;
        const TRUNCATE_IF_EXISTS: u16 = 0x0002;
        const CREATE_IF_MISSING: u16 = 0x0010;

        match self {
            CreationDisposition::CreateNew => FAIL_IF_EXISTS | CREATE_IF_MISSING,
            CreationDisposition::CreateAlways => TRUNCATE_IF_EXISTS | CREATE_IF_MISSING,
            CreationDisposition::OpenExisting => OPEN_IF_EXISTS,
            CreationDisposition::OpenAlways => OPEN_IF_EXISTS | CREATE_IF_MISSING,
            CreationDisposition::TruncateExisting => TRUNCATE_IF_EXISTS,
        }
    }

    /// CreateDisposition field of NT_CREATE_ANDX (2.2.4.64.1)
    pub fn nt_disposition(self) -> u32 {
        const FILE_OPEN: u32 = 1;
        const FILE_CREATE: u32 = 2;
        const FILE_OPEN_IF: u32 = 3;
        const FILE_OVERWRITE: u32 = 4;
        const FILE_OVERWRITE_IF: u32 = 5;

        match self {
            CreationDisposition::CreateNew => FILE_CREATE,
            CreationDisposition::CreateAlways => FILE_OVERWRITE_IF,
            CreationDisposition::OpenExisting => FILE_OPEN,
            CreationDisposition::OpenAlways => FILE_OPEN_IF,
            CreationDisposition::TruncateExisting => FILE_OVERWRITE,
        }
    }
}

impl TryFrom<u32> for CreationDisposition {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(CreationDisposition::CreateNew),
            2 => Ok(CreationDisposition::CreateAlways),
            3 => Ok(CreationDisposition::OpenExisting),
            4 => Ok(CreationDisposition::OpenAlways),
            5 => Ok(CreationDisposition::TruncateExisting),
            other => Err(Error::InvalidParameter(format!(
                "Unknown creation disposition {}",
                other
            ))),
        }
    }
}

/// Legacy SMB open mode: access in bits 0-2, sharing in bits 4-6 (2.2.1.1.2)
pub mod open_mode {
    pub const ACCESS_READ: u16 = 0x0000;
    pub const ACCESS_WRITE: u16 = 0x0001;
    pub const ACCESS_READ_WRITE: u16 = 0x0002;

    pub const SHARE_EXCLUSIVE: u16 = 0x0010;
    pub const SHARE_DENY_WRITE: u16 = 0x0020;
    pub const SHARE_DENY_READ: u16 = 0x0030;
    pub const SHARE_DENY_NONE: u16 = 0x0040;
}

/// Fold Win32 access and share flags into the legacy open mode word.
///
/// Access without either generic bit is treated as read access.
pub fn legacy_open_mode(access: DesiredAccess, share: ShareAccess) -> u16 {
    let read = access.intersects(DesiredAccess::GENERIC_READ | DesiredAccess::GENERIC_ALL);
    let write = access.intersects(DesiredAccess::GENERIC_WRITE | DesiredAccess::GENERIC_ALL);

    let access_bits = match (read, write) {
        (true, true) => open_mode::ACCESS_READ_WRITE,
        (false, true) => open_mode::ACCESS_WRITE,
        _ => open_mode::ACCESS_READ,
    };

    let share_read = share.contains(ShareAccess::FILE_SHARE_READ);
    let share_write = share.contains(ShareAccess::FILE_SHARE_WRITE);
    let share_bits = match (share_read, share_write) {
        (true, true) => open_mode::SHARE_DENY_NONE,
        (true, false) => open_mode::SHARE_DENY_WRITE,
        (false, true) => open_mode::SHARE_DENY_READ,
        (false, false) => open_mode::SHARE_EXCLUSIVE,
    };

    access_bits | share_bits
}
