//! Client configuration, loadable from TOML

use crate::error::{Error, Result};
use crate::netbios::name::NETBIOS_NAME_MAX_LEN;
use crate::netbios::resolver::{default_query_target, NameQueryOptions};
use crate::protocol::constants::NBT_SESSION_PORT;
use crate::protocol::messages::read::READ_RESPONSE_OVERHEAD;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Largest READ request this client will issue
pub const MAX_READ_CHUNK: u16 = 0xFF00;

/// How the OPEN step is encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OpenStrategyKind {
    /// NT_CREATE_ANDX when the server advertises NT SMBs, legacy OPEN otherwise
    Auto,
    /// SMB_COM_OPEN
    Legacy,
    /// SMB_COM_OPEN_ANDX
    #[serde(rename = "andx")]
    #[value(name = "andx")]
    AndX,
    /// SMB_COM_NT_CREATE_ANDX
    NtCreate,
}

/// CIFS client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// NetBIOS session service port
    pub port: u16,
    /// Our NetBIOS name, sent in the session request
    pub calling_name: String,
    /// Name we ask for in the session request
    pub called_name: String,
    /// Bound on every connect, send and receive, in seconds
    pub timeout_secs: u64,
    /// Try a broadcast name query before DNS
    pub netbios_lookup: bool,
    pub name_query_target: SocketAddr,
    pub name_query_timeout_ms: u64,
    /// Extra name query attempts after the first
    pub name_query_retries: u32,
    /// MaxBufferSize advertised in SESSION_SETUP; must hold a full READ reply
    pub max_buffer_size: u16,
    /// Cap on bytes requested by a single READ
    pub max_read_chunk: u16,
    pub open_strategy: OpenStrategyKind,
    pub native_os: String,
    pub native_lanman: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: NBT_SESSION_PORT,
            calling_name: "WINE".to_string(),
            called_name: "*SMBSERVER".to_string(),
            timeout_secs: 10,
            netbios_lookup: true,
            name_query_target: default_query_target(),
            name_query_timeout_ms: 1000,
            name_query_retries: 0,
            max_buffer_size: 0x1104,
            max_read_chunk: 1024,
            open_strategy: OpenStrategyKind::Auto,
            native_os: std::env::consts::OS.to_string(),
            native_lanman: "rust-cifs".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClientConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        for (what, name) in [("calling", &self.calling_name), ("called", &self.called_name)] {
            if name.is_empty() || name.len() > NETBIOS_NAME_MAX_LEN {
                return Err(Error::Config(format!(
                    "{} name must be 1 to {} bytes, got {:?}",
                    what, NETBIOS_NAME_MAX_LEN, name
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be non-zero".into()));
        }
        if self.netbios_lookup && self.name_query_timeout_ms == 0 {
            return Err(Error::Config("name_query_timeout_ms must be non-zero".into()));
        }
        if self.max_read_chunk == 0 || self.max_read_chunk > MAX_READ_CHUNK {
            return Err(Error::Config(format!(
                "max_read_chunk must be 1 to {}, got {}",
                MAX_READ_CHUNK, self.max_read_chunk
            )));
        }
        let reply_size = usize::from(self.max_read_chunk) + READ_RESPONSE_OVERHEAD;
        if reply_size > usize::from(self.max_buffer_size) {
            return Err(Error::Config(format!(
                "max_buffer_size {} cannot carry a {} byte READ reply (max_read_chunk {})",
                self.max_buffer_size, reply_size, self.max_read_chunk
            )));
        }
        Ok(())
    }

    /// Largest READ to issue, given our advertised buffer and the server's.
    ///
    /// `server_max_buffer` of zero means the server did not say.
    pub fn read_chunk_limit(&self, server_max_buffer: u32) -> usize {
        let own = usize::from(self.max_buffer_size).saturating_sub(READ_RESPONSE_OVERHEAD);
        let limit = usize::from(self.max_read_chunk).min(own);
        if server_max_buffer == 0 {
            return limit;
        }
        let server = usize::try_from(server_max_buffer)
            .unwrap_or(usize::MAX)
            .saturating_sub(READ_RESPONSE_OVERHEAD);
        limit.min(server)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Name query settings, or `None` when broadcast lookup is disabled
    pub fn name_query(&self) -> Option<NameQueryOptions> {
        self.netbios_lookup.then(|| NameQueryOptions {
            target: self.name_query_target,
            timeout: Duration::from_millis(self.name_query_timeout_ms),
            retries: self.name_query_retries,
        })
    }
}
