//! SMB1 file client
//!
//! Opens a remote file by UNC path and reads it through an opaque handle.

pub mod config;
pub mod connection;
pub mod file;
pub mod open;
pub mod registry;
pub mod unc;

pub use config::{ClientConfig, OpenStrategyKind};
pub use connection::{ConnectionState, SmbConnection};
pub use file::{CifsClient, OpenedFile, ReadOutcome};
pub use open::{OpenParams, OpenStrategy};
pub use registry::{FileHandle, HandleInfo, HandleRegistry, MemoryRegistry};
pub use unc::UncPath;
