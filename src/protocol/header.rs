//! SMB1 header (2.2.3.1)

use super::constants::{offsets, SmbCommand, FLAGS2_LONG_NAMES, SMB1_MAGIC, SMB_HEADER_SIZE};
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::convert::TryFrom;
use std::sync::atomic::{AtomicU16, Ordering};

/// Per-connection multiplex id source.
///
/// Ids wrap silently at `u16::MAX`; requests are never pipelined so a
/// wrapped id cannot collide with an outstanding one.
#[derive(Debug, Default)]
pub struct MultiplexCounter {
    next: AtomicU16,
}

impl MultiplexCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next multiplex id
    pub fn next(&self) -> u16 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Process id placed in every request header
pub fn local_process_id() -> u16 {
    (std::process::id() & 0xFFFF) as u16
}

/// SMB1 header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbHeader {
    pub command: SmbCommand,
    pub error_class: u8,
    pub error_code: u16,
    pub flags: u8,
    pub flags2: u16,
    pub tree_id: u16,
    pub process_id: u16,
    pub user_id: u16,
    pub multiplex_id: u16,
}

impl SmbHeader {
    pub const SIZE: usize = SMB_HEADER_SIZE;

    /// Build a request header, consuming one multiplex id
    pub fn request(
        command: SmbCommand,
        tree_id: u16,
        user_id: u16,
        mids: &MultiplexCounter,
    ) -> Self {
        Self {
            command,
            error_class: 0,
            error_code: 0,
            flags: 0,
            flags2: FLAGS2_LONG_NAMES,
            tree_id,
            process_id: local_process_id(),
            user_id,
            multiplex_id: mids.next(),
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::BufferTooSmall {
                need: Self::SIZE,
                have: buf.len(),
            });
        }

        if buf[offsets::PROTOCOL..offsets::PROTOCOL + 4] != SMB1_MAGIC {
            return Err(Error::InvalidHeader("Invalid SMB1 magic".into()));
        }

        Ok(Self {
            command: SmbCommand::try_from(buf[offsets::COMMAND])?,
            error_class: buf[offsets::ERROR_CLASS],
            error_code: LittleEndian::read_u16(&buf[offsets::ERROR_CODE..]),
            flags: buf[offsets::FLAGS],
            flags2: LittleEndian::read_u16(&buf[offsets::FLAGS2..]),
            tree_id: LittleEndian::read_u16(&buf[offsets::TID..]),
            process_id: LittleEndian::read_u16(&buf[offsets::PID..]),
            user_id: LittleEndian::read_u16(&buf[offsets::UID..]),
            multiplex_id: LittleEndian::read_u16(&buf[offsets::MID..]),
        })
    }

    /// Append the 32 header bytes to `buf`
    pub fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&SMB1_MAGIC);
        buf.write_u8(self.command as u8)?;
        buf.write_u8(self.error_class)?;
        buf.write_u8(0)?;
        buf.write_u16::<LittleEndian>(self.error_code)?;
        buf.write_u8(self.flags)?;
        buf.write_u16::<LittleEndian>(self.flags2)?;
        buf.extend_from_slice(&[0u8; offsets::PAD_LEN]);
        buf.write_u16::<LittleEndian>(self.tree_id)?;
        buf.write_u16::<LittleEndian>(self.process_id)?;
        buf.write_u16::<LittleEndian>(self.user_id)?;
        buf.write_u16::<LittleEndian>(self.multiplex_id)?;
        Ok(())
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Fail unless the error class is zero
    pub fn check_status(&self) -> Result<()> {
        if self.error_class == 0 {
            Ok(())
        } else {
            Err(Error::from_status(self.error_class, self.error_code))
        }
    }
}
