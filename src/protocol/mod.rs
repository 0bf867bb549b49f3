//! SMB1 protocol definitions

pub mod access;
pub mod constants;
pub mod header;
pub mod message;
pub mod messages;

pub use constants::{NetBiosMessageType, SmbCommand};
pub use header::*;
pub use message::{SmbRequestBuilder, SmbResponse};
