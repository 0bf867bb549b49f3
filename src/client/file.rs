//! Connection orchestrator and read service
//!
//! [`CifsClient::create_file`] turns a UNC path into a registered handle by
//! running resolution, the NetBIOS handshake and the SMB1 command sequence.
//! [`CifsClient::read_file`] reads through that handle in bounded chunks,
//! keeping the read offset in the registry.

use super::config::ClientConfig;
use super::connection::{SessionParams, SmbConnection};
use super::open::{fixed_strategy, select_strategy, OpenParams};
use super::registry::{FileHandle, HandleRegistry};
use super::unc::UncPath;
use crate::error::{Error, Result};
use crate::netbios::encode_netbios_name;
use crate::netbios::resolver::resolve_host;
use crate::transport::TcpTransport;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An opened remote file before it is handed to the registry
pub struct OpenedFile {
    pub connection: SmbConnection,
    pub tree_id: u16,
    pub user_id: u16,
    pub file_id: u16,
    /// Size reported by the open response, if the server sent one
    pub file_size: Option<u64>,
}

/// Result of a read: what was transferred, and why it stopped early if it
/// failed. Bytes transferred before a failure are still reported.
#[derive(Debug)]
pub struct ReadOutcome {
    pub bytes_read: usize,
    pub error: Option<Error>,
}

impl ReadOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<usize> {
        match self.error {
            None => Ok(self.bytes_read),
            Some(e) => Err(e),
        }
    }

    fn failed(error: Error) -> Self {
        Self {
            bytes_read: 0,
            error: Some(error),
        }
    }
}

/// SMB1 file client backed by a handle registry
pub struct CifsClient<R: HandleRegistry> {
    config: ClientConfig,
    registry: Arc<R>,
}

impl<R: HandleRegistry> CifsClient<R> {
    pub fn new(config: ClientConfig, registry: Arc<R>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Open `unc_path` and register it; [`FileHandle::INVALID`] on failure
    pub async fn create_file(&self, unc_path: &str, params: &OpenParams) -> FileHandle {
        match self.open(unc_path, params).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to open {}: {}", unc_path, e);
                FileHandle::INVALID
            }
        }
    }

    /// Open `unc_path` and register it with the registry
    pub async fn open(&self, unc_path: &str, params: &OpenParams) -> Result<FileHandle> {
        let opened = self.connect_and_open(unc_path, params).await?;
        let OpenedFile {
            connection,
            tree_id,
            user_id,
            file_id,
            file_size,
        } = opened;
        self.registry
            .register(connection, tree_id, user_id, file_id, file_size)
            .await
    }

    /// Resolve, connect and run NEGOTIATE, SESSION_SETUP, TREE_CONNECT and
    /// OPEN. The socket is closed if any step fails.
    pub async fn connect_and_open(&self, unc_path: &str, params: &OpenParams) -> Result<OpenedFile> {
        let unc = UncPath::parse(unc_path)?;
        if let Some(strategy) = fixed_strategy(self.config.open_strategy) {
            strategy.check(params)?;
        }

        let ip = resolve_host(&unc.host, self.config.name_query().as_ref()).await?;
        let addr = SocketAddr::from((ip, self.config.port));
        info!("Connecting to {} at {}", unc.host, addr);

        let called = encode_netbios_name(&self.config.called_name);
        let calling = encode_netbios_name(&self.config.calling_name);
        let transport =
            TcpTransport::connect_with_netbios(addr, &called, &calling, self.config.timeout())
                .await?;

        let mut connection = SmbConnection::new(Box::new(transport));
        match self.run_sequence(&mut connection, &unc, params).await {
            Ok((tree_id, user_id, file_id, file_size)) => {
                info!("Opened {} as fid 0x{:04x}", unc, file_id);
                Ok(OpenedFile {
                    connection,
                    tree_id,
                    user_id,
                    file_id,
                    file_size,
                })
            }
            Err(e) => {
                connection.shutdown().await.ok();
                Err(e)
            }
        }
    }

    async fn run_sequence(
        &self,
        connection: &mut SmbConnection,
        unc: &UncPath,
        params: &OpenParams,
    ) -> Result<(u16, u16, u16, Option<u64>)> {
        let negotiated = connection.negotiate().await?.clone();
        let strategy = select_strategy(self.config.open_strategy, &negotiated);

        let session = SessionParams {
            max_buffer_size: self.config.max_buffer_size,
            native_os: self.config.native_os.clone(),
            native_lanman: self.config.native_lanman.clone(),
        };
        let user_id = connection.session_setup(&session).await?;
        let tree_id = connection.tree_connect(&unc.host, &unc.share).await?;
        let opened = connection
            .open_file(strategy.as_ref(), &unc.file_name(), params)
            .await?;

        Ok((tree_id, user_id, opened.file_id, opened.file_size))
    }

    /// Read up to `buffer.len()` bytes at the handle's offset.
    ///
    /// Each READ asks for at most what both sides' buffers can carry. A short
    /// READ ends the loop only once the offset reaches the size reported at
    /// open; servers may cap replies below the requested count. Otherwise the
    /// loop runs until the buffer is full, a READ comes back empty, or a READ
    /// fails. The offset advances by exactly the bytes received and is written
    /// back to the registry either way.
    pub async fn read_file(&self, handle: FileHandle, buffer: &mut [u8]) -> ReadOutcome {
        let info = match self.registry.get_info(handle).await {
            Ok(info) => info,
            Err(e) => return ReadOutcome::failed(e),
        };
        let shared = match self.registry.connection(handle).await {
            Ok(connection) => connection,
            Err(e) => return ReadOutcome::failed(e),
        };
        let mut connection = shared.lock().await;

        let server_buffer = connection.negotiated().map_or(0, |n| n.max_buffer_size);
        let chunk = self.config.read_chunk_limit(server_buffer);
        if chunk == 0 {
            return ReadOutcome::failed(Error::InvalidParameter(format!(
                "server max buffer size {} cannot carry any READ data",
                server_buffer
            )));
        }
        let mut offset = info.offset;
        let mut total = 0usize;
        let mut error = None;

        while total < buffer.len() {
            let want = (buffer.len() - total).min(chunk);
            // `chunk` never exceeds max_read_chunk, which is a u16
            let count = want as u16;
            let data = match connection.read(info.file_id, offset, count).await {
                Ok(data) => data,
                Err(e) => {
                    error = Some(e);
                    break;
                }
            };
            if data.is_empty() {
                debug!("{}: end of file at offset {}", handle, offset);
                break;
            }

            let Some(next) = u32::try_from(data.len())
                .ok()
                .and_then(|n| offset.checked_add(n))
            else {
                error = Some(Error::InvalidParameter(format!(
                    "read offset {} overflows 32 bits",
                    offset
                )));
                break;
            };
            buffer[total..total + data.len()].copy_from_slice(&data);
            total += data.len();
            offset = next;

            if data.len() < want {
                if info.file_size.map_or(false, |size| u64::from(offset) >= size) {
                    debug!("{}: reached reported size at offset {}", handle, offset);
                    break;
                }
                debug!(
                    "{}: short READ of {} bytes for {} at offset {}",
                    handle,
                    data.len(),
                    want,
                    offset
                );
            }
        }
        drop(connection);

        if let Err(e) = self.registry.set_offset(handle, offset).await {
            error.get_or_insert(e);
        }
        if let Some(e) = &error {
            warn!("{}: read failed after {} bytes: {}", handle, total, e);
        }

        ReadOutcome {
            bytes_read: total,
            error,
        }
    }

    /// CLOSE the remote file, forget the handle and drop the connection
    pub async fn close_file(&self, handle: FileHandle) -> Result<()> {
        let info = self.registry.get_info(handle).await?;
        let shared = self.registry.unregister(handle).await?;
        let mut connection = shared.lock().await;

        let closed = connection.close_file(info.file_id).await;
        connection.shutdown().await.ok();
        closed
    }
}
