//! Transport layer for SMB1
//!
//! Tokio-based message transport beneath the command sequencer. A transport
//! carries whole SMB messages; framing is its own business.

use crate::error::Result;
use async_trait::async_trait;
use std::net::SocketAddr;

pub mod tcp;

pub use tcp::TcpTransport;

/// Trait for SMB message transports
#[async_trait]
pub trait SmbTransport: Send + Sync {
    /// Send one complete SMB message
    async fn send_message(&mut self, payload: &[u8]) -> Result<()>;

    /// Receive one complete SMB message
    async fn recv_message(&mut self) -> Result<Vec<u8>>;

    /// Check if the transport is connected
    fn is_connected(&self) -> bool;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;

    /// Get the remote address
    fn remote_addr(&self) -> Result<SocketAddr>;
}
