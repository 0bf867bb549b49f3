//! Handle registry
//!
//! The registry owns every open remote file: its connection, its ids and its
//! read offset. The client itself keeps nothing between calls.

use super::connection::SmbConnection;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Opaque handle returned by `create_file`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub u32);

impl FileHandle {
    /// The value handed out when an open fails
    pub const INVALID: FileHandle = FileHandle(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Session state kept per handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleInfo {
    pub tree_id: u16,
    pub user_id: u16,
    pub file_id: u16,
    pub offset: u32,
    /// Size reported when the file was opened, if the server sent one
    pub file_size: Option<u64>,
}

/// Connection shared between the registry and in-flight reads
pub type SharedConnection = Arc<Mutex<SmbConnection>>;

#[async_trait]
pub trait HandleRegistry: Send + Sync {
    async fn register(
        &self,
        connection: SmbConnection,
        tree_id: u16,
        user_id: u16,
        file_id: u16,
        file_size: Option<u64>,
    ) -> Result<FileHandle>;

    async fn get_info(&self, handle: FileHandle) -> Result<HandleInfo>;

    async fn set_offset(&self, handle: FileHandle, offset: u32) -> Result<()>;

    /// Connection that carries `handle`
    async fn connection(&self, handle: FileHandle) -> Result<SharedConnection>;

    /// Forget `handle`, handing back its connection
    async fn unregister(&self, handle: FileHandle) -> Result<SharedConnection>;
}

struct Entry {
    info: HandleInfo,
    connection: SharedConnection,
}

/// In-process registry
pub struct MemoryRegistry {
    entries: RwLock<HashMap<FileHandle, Entry>>,
    next_handle: AtomicU32,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_handle: AtomicU32::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn allocate(&self) -> FileHandle {
        loop {
            let handle = FileHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
            if handle.is_valid() {
                return handle;
            }
        }
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HandleRegistry for MemoryRegistry {
    async fn register(
        &self,
        connection: SmbConnection,
        tree_id: u16,
        user_id: u16,
        file_id: u16,
        file_size: Option<u64>,
    ) -> Result<FileHandle> {
        let handle = self.allocate();
        let entry = Entry {
            info: HandleInfo {
                tree_id,
                user_id,
                file_id,
                offset: 0,
                file_size,
            },
            connection: Arc::new(Mutex::new(connection)),
        };
        self.entries.write().await.insert(handle, entry);
        debug!(
            "Registered {} (tid 0x{:04x}, uid 0x{:04x}, fid 0x{:04x})",
            handle, tree_id, user_id, file_id
        );
        Ok(handle)
    }

    async fn get_info(&self, handle: FileHandle) -> Result<HandleInfo> {
        self.entries
            .read()
            .await
            .get(&handle)
            .map(|entry| entry.info)
            .ok_or(Error::InvalidHandle(handle.0))
    }

    async fn set_offset(&self, handle: FileHandle, offset: u32) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&handle)
            .ok_or(Error::InvalidHandle(handle.0))?;
        entry.info.offset = offset;
        Ok(())
    }

    async fn connection(&self, handle: FileHandle) -> Result<SharedConnection> {
        self.entries
            .read()
            .await
            .get(&handle)
            .map(|entry| entry.connection.clone())
            .ok_or(Error::InvalidHandle(handle.0))
    }

    async fn unregister(&self, handle: FileHandle) -> Result<SharedConnection> {
        let entry = self
            .entries
            .write()
            .await
            .remove(&handle)
            .ok_or(Error::InvalidHandle(handle.0))?;
        debug!("Unregistered {}", handle);
        Ok(entry.connection)
    }
}
