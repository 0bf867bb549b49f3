//! NetBIOS Name Service broadcast query (RFC 1002 section 4.2.12)
//!
//! A single NAME QUERY REQUEST is broadcast over UDP and the first positive
//! response supplies the IPv4 address. Callers fall back to DNS when this
//! fails.

use super::name::{encode_netbios_name, NETBIOS_WIRE_NAME_LEN};
use crate::error::{Error, Result};
use crate::protocol::constants::NBT_NAME_PORT;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Opcode QUERY with the recursion-desired and broadcast bits set
const NAME_QUERY_FLAGS: u16 = 0x0110;

/// Question type NB
const QUESTION_TYPE_NB: u16 = 0x0020;

/// Question class IN
const QUESTION_CLASS_IN: u16 = 0x0001;

/// Response bit in the flags word
const FLAG_RESPONSE: u16 = 0x8000;

/// Name service header length
const NS_HEADER_LEN: usize = 12;

/// Offset of NB_ADDRESS in a single-entry positive response: header, RR name,
/// type, class, TTL, RDLENGTH, NB_FLAGS
const ANSWER_ADDRESS_OFFSET: usize = NS_HEADER_LEN + NETBIOS_WIRE_NAME_LEN + 2 + 2 + 4 + 2 + 2;

/// Length of a single-entry positive name query response
const POSITIVE_RESPONSE_LEN: usize = ANSWER_ADDRESS_OFFSET + 4;

/// Default broadcast destination for name queries
pub fn default_query_target() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, NBT_NAME_PORT))
}

/// Name query parameters
#[derive(Debug, Clone)]
pub struct NameQueryOptions {
    /// Where the query is sent, normally the broadcast address on port 137
    pub target: SocketAddr,
    /// How long to wait for a reply to each attempt
    pub timeout: Duration,
    /// Extra attempts after the first one times out
    pub retries: u32,
}

impl Default for NameQueryOptions {
    fn default() -> Self {
        Self {
            target: default_query_target(),
            timeout: Duration::from_secs(1),
            retries: 0,
        }
    }
}

/// NAME QUERY REQUEST packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameQueryPacket {
    pub transaction_id: u16,
    pub name: String,
}

impl NameQueryPacket {
    pub fn new(name: &str) -> Self {
        Self {
            transaction_id: rand::random(),
            name: name.to_string(),
        }
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        let mut packet = Vec::with_capacity(NS_HEADER_LEN + NETBIOS_WIRE_NAME_LEN + 4);
        packet.write_u16::<BigEndian>(self.transaction_id)?;
        packet.write_u16::<BigEndian>(NAME_QUERY_FLAGS)?;
        packet.write_u16::<BigEndian>(1)?; // QDCOUNT
        packet.write_u16::<BigEndian>(0)?; // ANCOUNT
        packet.write_u16::<BigEndian>(0)?; // NSCOUNT
        packet.write_u16::<BigEndian>(0)?; // ARCOUNT
        packet.extend_from_slice(&encode_netbios_name(&self.name));
        packet.write_u16::<BigEndian>(QUESTION_TYPE_NB)?;
        packet.write_u16::<BigEndian>(QUESTION_CLASS_IN)?;
        Ok(packet)
    }
}

/// Extract the address from a positive NAME QUERY RESPONSE
pub fn parse_name_query_response(buf: &[u8], transaction_id: u16) -> Result<Ipv4Addr> {
    if buf.len() != POSITIVE_RESPONSE_LEN {
        return Err(Error::Resolution(format!(
            "Name query response is {} bytes, expected {}",
            buf.len(),
            POSITIVE_RESPONSE_LEN
        )));
    }

    let id = BigEndian::read_u16(&buf[0..2]);
    if id != transaction_id {
        return Err(Error::Resolution(format!(
            "Name query response for transaction 0x{:04x}, expected 0x{:04x}",
            id, transaction_id
        )));
    }

    let flags = BigEndian::read_u16(&buf[2..4]);
    if flags & FLAG_RESPONSE == 0 {
        return Err(Error::Resolution("Name query reply is not a response".into()));
    }
    let rcode = flags & 0x000F;
    if rcode != 0 {
        return Err(Error::Resolution(format!(
            "Name query failed with rcode {}",
            rcode
        )));
    }

    let addr = &buf[ANSWER_ADDRESS_OFFSET..ANSWER_ADDRESS_OFFSET + 4];
    Ok(Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3]))
}

/// Resolve `name` through a broadcast NetBIOS name query
pub async fn resolve_netbios_name(name: &str, options: &NameQueryOptions) -> Result<Ipv4Addr> {
    let socket = UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)))
        .await?;
    socket.set_broadcast(true)?;

    let attempts = options.retries.saturating_add(1);
    let mut last_error = Error::Timeout;

    for attempt in 1..=attempts {
        let packet = NameQueryPacket::new(name);
        debug!(
            "NetBIOS name query for {} to {} (attempt {}/{})",
            name, options.target, attempt, attempts
        );
        socket.send_to(&packet.build()?, options.target).await?;

        match query_once(&socket, packet.transaction_id, options.timeout).await {
            Ok(addr) => {
                debug!("NetBIOS name {} resolved to {}", name, addr);
                return Ok(addr);
            }
            Err(e) => {
                warn!("NetBIOS name query for {} failed: {}", name, e);
                last_error = e;
                if attempt < attempts {
                    // Linear backoff between attempts
                    tokio::time::sleep(options.timeout * attempt / 4).await;
                }
            }
        }
    }

    Err(last_error)
}

/// Wait up to `wait` for a valid answer; stray or malformed datagrams are
/// skipped
async fn query_once(socket: &UdpSocket, transaction_id: u16, wait: Duration) -> Result<Ipv4Addr> {
    let deadline = Instant::now() + wait;
    let mut buf = [0u8; 576];
    loop {
        let (n, from) = timeout_at(deadline, socket.recv_from(&mut buf))
            .await
            .map_err(|_| Error::Timeout)??;
        match parse_name_query_response(&buf[..n], transaction_id) {
            Ok(addr) => return Ok(addr),
            Err(e) => debug!("Ignoring {} byte datagram from {}: {}", n, from, e),
        }
    }
}

/// Resolve a host: IPv4 literals directly, then NetBIOS broadcast (when
/// enabled), then DNS.
pub async fn resolve_host(
    host: &str,
    netbios: Option<&NameQueryOptions>,
) -> Result<Ipv4Addr> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    if let Some(options) = netbios {
        match resolve_netbios_name(host, options).await {
            Ok(addr) => return Ok(addr),
            Err(e) => debug!("Falling back to DNS for {}: {}", host, e),
        }
    }

    let addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| Error::Resolution(format!("{}: {}", host, e)))?;
    for addr in addrs {
        if let SocketAddr::V4(v4) = addr {
            return Ok(*v4.ip());
        }
    }

    Err(Error::Resolution(format!("{}: no IPv4 address", host)))
}
