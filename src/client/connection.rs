//! SMB1 command sequencer
//!
//! One [`SmbConnection`] drives one transport through
//! `Connected -> DialectNegotiated -> SessionEstablished -> TreeAttached -> FileOpen`.
//! Requests are strictly synchronous: one request, one response. Any failure
//! moves the connection to `Failed`, after which it can only be closed.

use super::open::{OpenParams, OpenStrategy};
use crate::error::{Error, Result};
use crate::protocol::header::{MultiplexCounter, SmbHeader};
use crate::protocol::message::{SmbRequestBuilder, SmbResponse};
use crate::protocol::messages::close::{CloseRequest, CloseResponse};
use crate::protocol::messages::negotiate::{NegotiateRequest, NegotiateResponse};
use crate::protocol::messages::open::OpenResponse;
use crate::protocol::messages::read::{ReadRequest, ReadResponse};
use crate::protocol::messages::session::{SessionSetupRequest, SessionSetupResponse};
use crate::protocol::messages::tree::{TreeConnectRequest, TreeConnectResponse};
use crate::protocol::messages::{SmbReply, SmbRequest};
use crate::transport::SmbTransport;
use bytes::Bytes;
use tracing::{debug, trace};

/// Protocol state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    DialectNegotiated,
    SessionEstablished,
    TreeAttached,
    FileOpen,
    /// A request failed; the connection must be torn down
    Failed,
    Closed,
}

/// Session parameters for SESSION_SETUP
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub max_buffer_size: u16,
    pub native_os: String,
    pub native_lanman: String,
}

/// An SMB1 conversation over one transport
pub struct SmbConnection {
    transport: Box<dyn SmbTransport>,
    state: ConnectionState,
    mids: MultiplexCounter,
    negotiated: Option<NegotiateResponse>,
    user_id: u16,
    tree_id: u16,
}

impl SmbConnection {
    pub fn new(transport: Box<dyn SmbTransport>) -> Self {
        Self {
            transport,
            state: ConnectionState::Connected,
            mids: MultiplexCounter::new(),
            negotiated: None,
            user_id: 0,
            tree_id: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn user_id(&self) -> u16 {
        self.user_id
    }

    pub fn tree_id(&self) -> u16 {
        self.tree_id
    }

    /// NEGOTIATE result, once negotiated
    pub fn negotiated(&self) -> Option<&NegotiateResponse> {
        self.negotiated.as_ref()
    }

    /// NEGOTIATE offering "NT LM 0.12"
    pub async fn negotiate(&mut self) -> Result<&NegotiateResponse> {
        self.expect_state(ConnectionState::Connected, "NEGOTIATE")?;
        let response: NegotiateResponse = self.transact(&NegotiateRequest::default()).await?;
        debug!(
            "Negotiated dialect index {} (max buffer {}, capabilities 0x{:08x})",
            response.dialect_index, response.max_buffer_size, response.capabilities
        );
        self.state = ConnectionState::DialectNegotiated;
        Ok(self.negotiated.insert(response))
    }

    /// Null-session SESSION_SETUP_ANDX; returns the user id
    pub async fn session_setup(&mut self, params: &SessionParams) -> Result<u16> {
        self.expect_state(ConnectionState::DialectNegotiated, "SESSION_SETUP")?;
        let request = SessionSetupRequest::anonymous(
            params.max_buffer_size,
            &params.native_os,
            &params.native_lanman,
        );
        let response: SessionSetupResponse = self.transact(&request).await?;
        debug!(
            "Session established, uid 0x{:04x}{}",
            response.user_id,
            if response.guest { " (guest)" } else { "" }
        );
        self.user_id = response.user_id;
        self.state = ConnectionState::SessionEstablished;
        Ok(response.user_id)
    }

    /// TREE_CONNECT_ANDX to `\\host\share`; returns the tree id
    pub async fn tree_connect(&mut self, host: &str, share: &str) -> Result<u16> {
        self.expect_state(ConnectionState::SessionEstablished, "TREE_CONNECT")?;
        let request = TreeConnectRequest::new(host, share);
        let response: TreeConnectResponse = self.transact(&request).await?;
        debug!("Attached to {}, tid 0x{:04x}", request.path, response.tree_id);
        self.tree_id = response.tree_id;
        self.state = ConnectionState::TreeAttached;
        Ok(response.tree_id)
    }

    /// Open `file_name` with the given strategy
    pub async fn open_file(
        &mut self,
        strategy: &dyn OpenStrategy,
        file_name: &str,
        params: &OpenParams,
    ) -> Result<OpenResponse> {
        self.expect_state(ConnectionState::TreeAttached, "OPEN")?;
        strategy.check(params)?;
        let response = strategy.open(self, file_name, params).await?;
        debug!(
            "Opened {} with {:?}, fid 0x{:04x}",
            file_name,
            strategy.kind(),
            response.file_id
        );
        self.state = ConnectionState::FileOpen;
        Ok(response)
    }

    /// READ up to `count` bytes at `offset`.
    ///
    /// A response carrying more than `count` bytes is rejected.
    pub async fn read(&mut self, file_id: u16, offset: u32, count: u16) -> Result<Bytes> {
        self.expect_state(ConnectionState::FileOpen, "READ")?;
        let response: ReadResponse = self
            .transact(&ReadRequest {
                file_id,
                count,
                offset,
            })
            .await?;
        if response.data.len() > count as usize {
            self.state = ConnectionState::Failed;
            return Err(Error::ParseError(format!(
                "READ returned {} bytes for a {} byte request",
                response.data.len(),
                count
            )));
        }
        trace!("READ fid 0x{:04x} @{}: {} bytes", file_id, offset, response.data.len());
        Ok(response.data)
    }

    /// CLOSE the open file
    pub async fn close_file(&mut self, file_id: u16) -> Result<()> {
        self.expect_state(ConnectionState::FileOpen, "CLOSE")?;
        let _: CloseResponse = self.transact(&CloseRequest { file_id }).await?;
        self.state = ConnectionState::TreeAttached;
        Ok(())
    }

    /// Drop the transport; the connection is unusable afterwards
    pub async fn shutdown(&mut self) -> Result<()> {
        self.state = ConnectionState::Closed;
        self.transport.close().await
    }

    /// Send one request and decode its response
    pub(crate) async fn transact<Req, Rep>(&mut self, request: &Req) -> Result<Rep>
    where
        Req: SmbRequest + Sync,
        Rep: SmbReply,
    {
        match self.exchange(request).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                debug!("{:?} failed: {}", Req::COMMAND, e);
                self.state = ConnectionState::Failed;
                Err(e)
            }
        }
    }

    async fn exchange<Req, Rep>(&mut self, request: &Req) -> Result<Rep>
    where
        Req: SmbRequest + Sync,
        Rep: SmbReply,
    {
        let header = SmbHeader::request(Req::COMMAND, self.tree_id, self.user_id, &self.mids);
        let multiplex_id = header.multiplex_id;
        let mut builder = SmbRequestBuilder::new(header);
        request.write_blocks(&mut builder);
        let bytes = builder.build()?;

        trace!("Sending {:?} mid {}", Req::COMMAND, multiplex_id);
        self.transport.send_message(&bytes).await?;
        let raw = self.transport.recv_message().await?;

        let response = SmbResponse::parse(raw)?;
        if response.command() != Req::COMMAND {
            return Err(Error::InvalidHeader(format!(
                "Expected {:?} response, got {:?}",
                Req::COMMAND,
                response.command()
            )));
        }
        if response.header().multiplex_id != multiplex_id {
            return Err(Error::InvalidHeader(format!(
                "Response mid {} does not match request mid {}",
                response.header().multiplex_id,
                multiplex_id
            )));
        }

        Rep::parse(&response)
    }

    fn expect_state(&self, expected: ConnectionState, command: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState(format!(
                "{} requires {:?}, connection is {:?}",
                command, expected, self.state
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TcpTransport;
    use std::time::Duration;

    #[tokio::test]
    async fn test_commands_require_their_state() {
        let mut conn = SmbConnection::new(Box::new(TcpTransport::new(Duration::from_secs(1))));
        assert_eq!(conn.state(), ConnectionState::Connected);

        assert!(matches!(
            conn.tree_connect("host", "share").await,
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(conn.read(1, 0, 10).await, Err(Error::InvalidState(_))));
        assert!(matches!(conn.close_file(1).await, Err(Error::InvalidState(_))));
        // Rejected before any I/O, so the state is untouched
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_transport_failure_marks_connection_failed() {
        let mut conn = SmbConnection::new(Box::new(TcpTransport::new(Duration::from_secs(1))));
        assert!(matches!(conn.negotiate().await, Err(Error::ConnectionClosed)));
        assert_eq!(conn.state(), ConnectionState::Failed);
        assert!(conn.negotiated().is_none());

        conn.shutdown().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }
}
