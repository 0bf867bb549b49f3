//! SMB1 message framing: header, parameter block and data block (2.2.3)
//!
//! Requests are assembled with [`SmbRequestBuilder`], which tracks both blocks
//! separately and refuses to emit a message whose counts do not fit their wire
//! fields. Responses are wrapped in [`SmbResponse`], which validates the
//! advertised WordCount and ByteCount against the received length before any
//! accessor can touch the blocks.

use super::constants::{offsets, SmbCommand};
use super::header::SmbHeader;
use crate::error::{Error, Result};
use crate::netbios::NetBiosHeader;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use bytes::Bytes;

/// Largest parameter block, in 16-bit words
pub const MAX_WORD_COUNT: usize = u8::MAX as usize;

/// Largest data block, in bytes
pub const MAX_BYTE_COUNT: usize = u16::MAX as usize;

/// Builder for one SMB1 request
#[derive(Debug, Clone)]
pub struct SmbRequestBuilder {
    header: SmbHeader,
    parameters: Vec<u8>,
    data: Vec<u8>,
}

impl SmbRequestBuilder {
    pub fn new(header: SmbHeader) -> Self {
        Self {
            header,
            parameters: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn header(&self) -> &SmbHeader {
        &self.header
    }

    pub fn param_u8(&mut self, value: u8) -> &mut Self {
        self.parameters.push(value);
        self
    }

    pub fn param_u16(&mut self, value: u16) -> &mut Self {
        self.parameters.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn param_u32(&mut self, value: u32) -> &mut Self {
        self.parameters.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn param_u64(&mut self, value: u64) -> &mut Self {
        self.parameters.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn data_u8(&mut self, value: u8) -> &mut Self {
        self.data.push(value);
        self
    }

    pub fn data_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Append a NUL-terminated ASCII string to the data block
    pub fn data_cstr(&mut self, s: &str) -> &mut Self {
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self
    }

    /// Serialize header, WordCount, parameters, ByteCount and data
    pub fn build(&self) -> Result<Vec<u8>> {
        if self.parameters.len() % 2 != 0 {
            return Err(Error::InvalidParameter(format!(
                "Parameter block of {} bytes is not word aligned",
                self.parameters.len()
            )));
        }
        let word_count = self.parameters.len() / 2;
        if word_count > MAX_WORD_COUNT {
            return Err(Error::MessageTooLarge(format!(
                "{} parameter words exceed {}",
                word_count, MAX_WORD_COUNT
            )));
        }
        if self.data.len() > MAX_BYTE_COUNT {
            return Err(Error::MessageTooLarge(format!(
                "{} data bytes exceed {}",
                self.data.len(),
                MAX_BYTE_COUNT
            )));
        }

        let total = SmbHeader::SIZE + 1 + self.parameters.len() + 2 + self.data.len();
        if total > NetBiosHeader::MAX_LENGTH as usize {
            return Err(Error::MessageTooLarge(format!(
                "{} byte message exceeds NetBIOS frame limit",
                total
            )));
        }

        let mut buf = Vec::with_capacity(total);
        self.header.write_to(&mut buf)?;
        buf.write_u8(word_count as u8)?;
        buf.extend_from_slice(&self.parameters);
        buf.write_u16::<LittleEndian>(self.data.len() as u16)?;
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }
}

/// A validated SMB1 response
#[derive(Debug, Clone)]
pub struct SmbResponse {
    header: SmbHeader,
    raw: Bytes,
    params_end: usize,
    data_start: usize,
    data_end: usize,
}

impl SmbResponse {
    /// Parse and validate a response.
    ///
    /// A non-zero error class is reported before the blocks are examined,
    /// since error responses usually carry empty blocks.
    pub fn parse(raw: impl Into<Bytes>) -> Result<Self> {
        let raw: Bytes = raw.into();
        let header = SmbHeader::parse(&raw)?;
        header.check_status()?;

        if raw.len() <= offsets::WORD_COUNT {
            return Err(Error::BufferTooSmall {
                need: offsets::WORD_COUNT + 1,
                have: raw.len(),
            });
        }

        let word_count = raw[offsets::WORD_COUNT] as usize;
        let params_end = offsets::PARAMETERS + word_count * 2;
        if params_end + 2 > raw.len() {
            return Err(Error::ParseError(format!(
                "WordCount {} overruns {} byte response",
                word_count,
                raw.len()
            )));
        }

        let byte_count = LittleEndian::read_u16(&raw[params_end..]) as usize;
        let data_start = params_end + 2;
        let data_end = data_start + byte_count;
        if data_end > raw.len() {
            return Err(Error::ParseError(format!(
                "ByteCount {} overruns {} byte response",
                byte_count,
                raw.len()
            )));
        }

        Ok(Self {
            header,
            raw,
            params_end,
            data_start,
            data_end,
        })
    }

    pub fn header(&self) -> &SmbHeader {
        &self.header
    }

    pub fn command(&self) -> SmbCommand {
        self.header.command
    }

    pub fn word_count(&self) -> usize {
        (self.params_end - offsets::PARAMETERS) / 2
    }

    pub fn parameters(&self) -> &[u8] {
        &self.raw[offsets::PARAMETERS..self.params_end]
    }

    pub fn data(&self) -> &[u8] {
        &self.raw[self.data_start..self.data_end]
    }

    /// Fail unless the parameter block holds at least `words` words
    pub fn require_words(&self, words: usize) -> Result<()> {
        if self.word_count() < words {
            return Err(Error::ParseError(format!(
                "{:?} response carries {} parameter words, expected {}",
                self.header.command,
                self.word_count(),
                words
            )));
        }
        Ok(())
    }

    /// Parameter word `index`
    pub fn word(&self, index: usize) -> Result<u16> {
        self.u16_at(index * 2)
    }

    pub fn u8_at(&self, byte_offset: usize) -> Result<u8> {
        self.param_slice(byte_offset, 1).map(|b| b[0])
    }

    pub fn u16_at(&self, byte_offset: usize) -> Result<u16> {
        self.param_slice(byte_offset, 2).map(LittleEndian::read_u16)
    }

    pub fn u32_at(&self, byte_offset: usize) -> Result<u32> {
        self.param_slice(byte_offset, 4).map(LittleEndian::read_u32)
    }

    pub fn u64_at(&self, byte_offset: usize) -> Result<u64> {
        self.param_slice(byte_offset, 8).map(LittleEndian::read_u64)
    }

    fn param_slice(&self, byte_offset: usize, len: usize) -> Result<&[u8]> {
        let params = self.parameters();
        params
            .get(byte_offset..byte_offset + len)
            .ok_or(Error::BufferTooSmall {
                need: byte_offset + len,
                have: params.len(),
            })
    }
}
