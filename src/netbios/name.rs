//! NetBIOS name first-level encoding (RFC 1001 section 14.1)
//!
//! A name is padded with spaces to 15 bytes, followed by a suffix byte, and
//! every byte is split into two nibbles each added to 'A'. On the wire the 32
//! encoded bytes are preceded by their length (0x20) and followed by the empty
//! scope terminator.

use crate::error::{Error, Result};
use std::convert::TryFrom;

/// Maximum NetBIOS name length (before padding)
pub const NETBIOS_NAME_MAX_LEN: usize = 15;

/// NetBIOS name length after padding
pub const NETBIOS_NAME_LEN: usize = 16;

/// NetBIOS encoded name length (after encoding, each byte becomes 2 bytes)
pub const NETBIOS_ENCODED_NAME_LEN: usize = 32;

/// Length-prefixed, scope-terminated wire form
pub const NETBIOS_WIRE_NAME_LEN: usize = NETBIOS_ENCODED_NAME_LEN + 2;

/// NetBIOS name types (16th byte)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetBiosNameType {
    /// Workstation service
    Workstation = 0x00,
    /// Messenger service
    Messenger = 0x03,
    /// File server service
    FileServer = 0x20,
}

impl TryFrom<u8> for NetBiosNameType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x00 => Ok(NetBiosNameType::Workstation),
            0x03 => Ok(NetBiosNameType::Messenger),
            0x20 => Ok(NetBiosNameType::FileServer),
            other => Err(other),
        }
    }
}

/// Encode `name` into its 34-byte wire form with a zero suffix byte.
///
/// Names longer than 15 bytes are truncated.
pub fn encode_netbios_name(name: &str) -> [u8; NETBIOS_WIRE_NAME_LEN] {
    encode_netbios_name_with_type(name, NetBiosNameType::Workstation)
}

/// Encode `name` into its 34-byte wire form with the given suffix byte
pub fn encode_netbios_name_with_type(
    name: &str,
    name_type: NetBiosNameType,
) -> [u8; NETBIOS_WIRE_NAME_LEN] {
    let bytes = name.as_bytes();
    let len = bytes.len().min(NETBIOS_NAME_MAX_LEN);

    let mut padded = [b' '; NETBIOS_NAME_LEN];
    padded[..len].copy_from_slice(&bytes[..len]);
    padded[NETBIOS_NAME_MAX_LEN] = name_type as u8;

    let mut encoded = [0u8; NETBIOS_WIRE_NAME_LEN];
    encoded[0] = NETBIOS_ENCODED_NAME_LEN as u8;
    for (i, &byte) in padded.iter().enumerate() {
        encoded[1 + i * 2] = b'A' + (byte >> 4);
        encoded[2 + i * 2] = b'A' + (byte & 0x0F);
    }
    // encoded[33] stays zero: empty scope

    encoded
}

/// Decode a 34-byte wire name into its space-padded 15-byte name and suffix
pub fn decode_netbios_name(wire: &[u8]) -> Result<(String, u8)> {
    if wire.len() != NETBIOS_WIRE_NAME_LEN {
        return Err(Error::ParseError(format!(
            "Encoded NetBIOS name length {} != {}",
            wire.len(),
            NETBIOS_WIRE_NAME_LEN
        )));
    }
    if wire[0] as usize != NETBIOS_ENCODED_NAME_LEN || wire[NETBIOS_WIRE_NAME_LEN - 1] != 0 {
        return Err(Error::ParseError(
            "NetBIOS name is not a 32-byte label with empty scope".into(),
        ));
    }

    let mut decoded = [0u8; NETBIOS_NAME_LEN];
    for (i, pair) in wire[1..=NETBIOS_ENCODED_NAME_LEN].chunks_exact(2).enumerate() {
        let (high, low) = (pair[0], pair[1]);
        if !(b'A'..=b'P').contains(&high) || !(b'A'..=b'P').contains(&low) {
            return Err(Error::ParseError(format!(
                "Invalid encoded characters at position {}",
                i
            )));
        }
        decoded[i] = ((high - b'A') << 4) | (low - b'A');
    }

    let name = String::from_utf8_lossy(&decoded[..NETBIOS_NAME_MAX_LEN]).into_owned();
    Ok((name, decoded[NETBIOS_NAME_MAX_LEN]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_name() {
        let encoded = encode_netbios_name("WINE");

        assert_eq!(encoded[0], 0x20);
        // 'W' = 0x57 -> "FH", 'I' = 0x49 -> "EJ"
        assert_eq!(&encoded[1..5], b"FHEJ");
        // space padding -> "CA"
        assert_eq!(&encoded[9..11], b"CA");
        // zero suffix -> "AA"
        assert_eq!(&encoded[31..33], b"AA");
        assert_eq!(encoded[33], 0);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for name in ["SERVER", "WS1", "*SMBSERVER", "A", "MAXLENGTHNAMEEE", ""] {
            let (decoded, suffix) = decode_netbios_name(&encode_netbios_name(name)).unwrap();
            assert_eq!(decoded, format!("{:<15}", name));
            assert_eq!(suffix, 0);
        }
    }

    #[test]
    fn test_long_name_truncated() {
        let (decoded, _) =
            decode_netbios_name(&encode_netbios_name("THISNAMEISWAYTOOLONG")).unwrap();
        assert_eq!(decoded, "THISNAMEISWAYTO");
    }

    #[test]
    fn test_name_type_suffix() {
        let encoded = encode_netbios_name_with_type("FILESRV", NetBiosNameType::FileServer);
        let (_, suffix) = decode_netbios_name(&encoded).unwrap();
        assert_eq!(NetBiosNameType::try_from(suffix), Ok(NetBiosNameType::FileServer));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut encoded = encode_netbios_name("SERVER");
        encoded[5] = b'z';
        assert!(decode_netbios_name(&encoded).is_err());
        assert!(decode_netbios_name(&encoded[..20]).is_err());
    }
}
