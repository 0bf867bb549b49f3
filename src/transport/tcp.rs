//! NetBIOS Session Service transport over TCP (RFC 1002 section 4.3)

use super::SmbTransport;
use crate::error::{Error, Result};
use crate::netbios::{NetBiosHeader, NetBiosMessage};
use crate::protocol::NetBiosMessageType;
use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Default bound on every blocking network operation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP transport with NetBIOS session framing
pub struct TcpTransport {
    stream: Option<TcpStream>,
    read_buffer: BytesMut,
    remote_addr: Option<SocketAddr>,
    timeout: Duration,
}

impl TcpTransport {
    /// Create an unconnected transport
    pub fn new(timeout: Duration) -> Self {
        Self {
            stream: None,
            read_buffer: BytesMut::with_capacity(8192),
            remote_addr: None,
            timeout,
        }
    }

    /// Wrap an already connected stream; no session handshake is performed
    pub fn from_stream(stream: TcpStream, timeout: Duration) -> Self {
        let remote_addr = stream.peer_addr().ok();

        Self {
            stream: Some(stream),
            read_buffer: BytesMut::with_capacity(8192),
            remote_addr,
            timeout,
        }
    }

    /// Connect and establish a NetBIOS session.
    ///
    /// `called_name` and `calling_name` are 34-byte wire-encoded names. The
    /// socket is dropped if the handshake fails.
    pub async fn connect_with_netbios(
        addr: SocketAddr,
        called_name: &[u8],
        calling_name: &[u8],
        timeout: Duration,
    ) -> Result<Self> {
        let mut transport = Self::new(timeout);
        transport.connect(addr).await?;

        if let Err(e) = transport.session_request(called_name, calling_name).await {
            debug!("NetBIOS session setup with {} failed: {}", addr, e);
            transport.close().await.ok();
            return Err(e);
        }

        debug!("NetBIOS session established with {}", addr);
        Ok(transport)
    }

    /// Open the TCP connection
    pub async fn connect(&mut self, addr: SocketAddr) -> Result<()> {
        let stream = with_timeout(self.timeout, TcpStream::connect(addr))
            .await?
            .map_err(|e| Error::ConnectionError(format!("{}: {}", addr, e)))?;
        stream.set_nodelay(true)?;
        self.remote_addr = Some(stream.peer_addr()?);
        self.stream = Some(stream);
        Ok(())
    }

    async fn session_request(&mut self, called_name: &[u8], calling_name: &[u8]) -> Result<()> {
        let request = NetBiosMessage::session_request(called_name, calling_name)?;
        self.write_all(&request.to_bytes()).await?;

        let timeout = self.timeout;
        let response = with_timeout(timeout, self.read_frame()).await??;
        match response.header.message_type {
            NetBiosMessageType::PositiveResponse => Ok(()),
            NetBiosMessageType::NegativeResponse => {
                let error_code = response.payload.first().copied().unwrap_or(0);
                Err(Error::SessionRejected(format!(
                    "negative session response, error code 0x{:02x}",
                    error_code
                )))
            }
            other => Err(Error::SessionRejected(format!(
                "unexpected NetBIOS response type: {:?}",
                other
            ))),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        with_timeout(timeout, async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await??;
        Ok(())
    }

    /// Read one whole frame; a short read is a failure
    async fn read_frame(&mut self) -> Result<NetBiosMessage> {
        while self.read_buffer.len() < NetBiosHeader::SIZE {
            self.read_more().await?;
        }

        let header = NetBiosHeader::parse(&self.read_buffer)?;
        let total_size = NetBiosHeader::SIZE + header.length as usize;

        while self.read_buffer.len() < total_size {
            self.read_more().await?;
        }

        let frame = self.read_buffer.split_to(total_size);
        NetBiosMessage::parse(&frame)
    }

    /// Read more data from the stream into the buffer
    async fn read_more(&mut self) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        let mut temp_buf = [0u8; 8192];
        let n = stream.read(&mut temp_buf).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        self.read_buffer.put_slice(&temp_buf[..n]);
        Ok(n)
    }

    /// Next session message, skipping keepalives
    async fn next_session_message(&mut self) -> Result<Vec<u8>> {
        loop {
            let frame = self.read_frame().await?;
            match frame.header.message_type {
                NetBiosMessageType::SessionMessage => return Ok(frame.payload),
                NetBiosMessageType::Keepalive => trace!("Skipping NetBIOS keepalive"),
                other => {
                    return Err(Error::ConnectionError(format!(
                        "Unexpected NetBIOS frame type {:?}",
                        other
                    )))
                }
            }
        }
    }
}

async fn with_timeout<F: Future>(limit: Duration, fut: F) -> Result<F::Output> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout)
}

#[async_trait]
impl SmbTransport for TcpTransport {
    async fn send_message(&mut self, payload: &[u8]) -> Result<()> {
        let msg = NetBiosMessage::session_message(payload.to_vec())?;
        trace!("Sending {} byte session message", payload.len());
        self.write_all(&msg.to_bytes()).await
    }

    async fn recv_message(&mut self) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        with_timeout(timeout, self.next_session_message()).await?
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await.ok();
        }
        self.remote_addr = None;
        self.read_buffer.clear();
        Ok(())
    }

    fn remote_addr(&self) -> Result<SocketAddr> {
        self.remote_addr.ok_or(Error::ConnectionClosed)
    }
}
