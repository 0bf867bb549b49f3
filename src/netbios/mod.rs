//! NetBIOS over TCP (NBT) protocol implementation
//!
//! Session Service framing and name encoding per RFC 1001/1002, plus the
//! broadcast Name Service query used to locate servers.

use crate::error::{Error, Result};
use crate::protocol::NetBiosMessageType;
use bytes::{BufMut, Bytes, BytesMut};
use std::convert::TryFrom;

pub mod name;
pub mod resolver;

pub use name::{decode_netbios_name, encode_netbios_name};
pub use resolver::resolve_netbios_name;

/// Flags byte sent with the Session Request
pub const SESSION_REQUEST_FLAGS: u8 = 0x40;

/// NetBIOS Session Service header (4 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetBiosHeader {
    /// Message type
    pub message_type: NetBiosMessageType,
    /// Flags, excluding the length extension bit
    pub flags: u8,
    /// Length of the message payload (17 bits max)
    pub length: u32,
}

impl NetBiosHeader {
    /// Maximum payload length (17 bits)
    pub const MAX_LENGTH: u32 = 0x1FFFF;

    /// Header size in bytes
    pub const SIZE: usize = 4;

    /// Create a new NetBIOS header
    pub fn new(message_type: NetBiosMessageType, length: u32) -> Result<Self> {
        if length > Self::MAX_LENGTH {
            return Err(Error::MessageTooLarge(format!(
                "NetBIOS length {} exceeds maximum {}",
                length,
                Self::MAX_LENGTH
            )));
        }
        Ok(Self {
            message_type,
            flags: 0,
            length,
        })
    }

    /// Create a session message header
    pub fn session_message(length: u32) -> Result<Self> {
        Self::new(NetBiosMessageType::SessionMessage, length)
    }

    /// Parse a NetBIOS header from bytes
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::BufferTooSmall {
                need: Self::SIZE,
                have: buf.len(),
            });
        }

        let message_type = NetBiosMessageType::try_from(buf[0])?;

        // Length is in the lower 17 bits of bytes 1-3
        let length = ((buf[1] as u32) << 16) | ((buf[2] as u32) << 8) | (buf[3] as u32);

        Ok(Self {
            message_type,
            flags: buf[1] & 0xFE,
            length: length & Self::MAX_LENGTH,
        })
    }

    /// Serialize the header to bytes
    pub fn to_bytes(&self) -> [u8; 4] {
        [
            self.message_type as u8,
            (self.flags & 0xFE) | ((self.length >> 16) & 0x01) as u8,
            ((self.length >> 8) & 0xFF) as u8,
            (self.length & 0xFF) as u8,
        ]
    }
}

/// NetBIOS session message wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetBiosMessage {
    pub header: NetBiosHeader,
    pub payload: Vec<u8>,
}

impl NetBiosMessage {
    /// Create a new session message
    pub fn session_message(payload: Vec<u8>) -> Result<Self> {
        let header = NetBiosHeader::session_message(payload.len() as u32)?;
        Ok(Self { header, payload })
    }

    /// Create a session request carrying two wire-encoded names
    pub fn session_request(called_name: &[u8], calling_name: &[u8]) -> Result<Self> {
        let mut payload = Vec::with_capacity(called_name.len() + calling_name.len());
        payload.extend_from_slice(called_name);
        payload.extend_from_slice(calling_name);

        let mut header =
            NetBiosHeader::new(NetBiosMessageType::SessionRequest, payload.len() as u32)?;
        header.flags = SESSION_REQUEST_FLAGS;
        Ok(Self { header, payload })
    }

    /// Create a positive session response
    pub fn positive_response() -> Result<Self> {
        let header = NetBiosHeader::new(NetBiosMessageType::PositiveResponse, 0)?;
        Ok(Self {
            header,
            payload: Vec::new(),
        })
    }

    /// Create a negative session response
    pub fn negative_response(error_code: u8) -> Result<Self> {
        let header = NetBiosHeader::new(NetBiosMessageType::NegativeResponse, 1)?;
        Ok(Self {
            header,
            payload: vec![error_code],
        })
    }

    /// Serialize the entire message to bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(NetBiosHeader::SIZE + self.payload.len());
        buf.put_slice(&self.header.to_bytes());
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Parse a complete NetBIOS message from bytes
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let header = NetBiosHeader::parse(buf)?;

        let total_len = NetBiosHeader::SIZE + header.length as usize;
        if buf.len() < total_len {
            return Err(Error::BufferTooSmall {
                need: total_len,
                have: buf.len(),
            });
        }

        let payload = buf[NetBiosHeader::SIZE..total_len].to_vec();
        Ok(Self { header, payload })
    }
}
