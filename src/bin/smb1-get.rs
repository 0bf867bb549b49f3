//! SMB1 file download CLI

use anyhow::{bail, Context};
use clap::Parser;
use rust_cifs::client::{CifsClient, ClientConfig, MemoryRegistry, OpenParams, OpenStrategyKind};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Bytes requested per `read_file` call
const COPY_BUFFER_SIZE: usize = 16 * 1024;

#[derive(Parser, Debug)]
#[command(name = "smb1-get")]
#[command(about = "Download a file from an SMB1 (CIFS) server", long_about = None)]
struct Args {
    /// Remote file as \\host\share\path
    unc: String,

    /// Local file (defaults to the last path segment)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// NetBIOS session port
    #[arg(short, long)]
    port: Option<u16>,

    /// Network timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// How to encode the OPEN step
    #[arg(long, value_enum)]
    open_strategy: Option<OpenStrategyKind>,

    /// Skip the NetBIOS broadcast name query
    #[arg(long)]
    no_netbios: bool,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(kind) = self.open_strategy {
            config.open_strategy = kind;
        }
        if self.no_netbios {
            config.netbios_lookup = false;
        }
        Ok(config)
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(
                self.unc
                    .rsplit('\\')
                    .find(|segment| !segment.is_empty())
                    .unwrap_or("download"),
            )
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = args.client_config()?;
    let registry = Arc::new(MemoryRegistry::new());
    let client = CifsClient::new(config, registry)?;

    let handle = client
        .open(&args.unc, &OpenParams::read_existing())
        .await
        .with_context(|| format!("opening {}", args.unc))?;

    let local_path = args.output_path();
    tracing::info!("Downloading {} -> {}", args.unc, local_path.display());
    let mut local = tokio::fs::File::create(&local_path)
        .await
        .with_context(|| format!("creating {}", local_path.display()))?;

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let outcome = client.read_file(handle, &mut buffer).await;
        local.write_all(&buffer[..outcome.bytes_read]).await?;
        total += outcome.bytes_read as u64;

        if let Some(e) = outcome.error {
            bail!("read failed after {} bytes: {}", total, e);
        }
        if outcome.bytes_read < buffer.len() {
            break;
        }
    }
    local.flush().await?;

    client.close_file(handle).await?;
    tracing::info!("Downloaded {} bytes", total);
    Ok(())
}
