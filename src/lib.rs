//! SMB1 (CIFS) file client in Rust
//!
//! Reads files from SMB1 servers over NetBIOS session transport: broadcast
//! name resolution, the NEGOTIATE / SESSION_SETUP / TREE_CONNECT / OPEN
//! sequence, and chunked READs through an opaque handle.

#![allow(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod netbios;
pub mod protocol;
pub mod transport;

#[cfg(feature = "client")]
pub mod client;

#[cfg(test)]
pub mod e2e_tests;

pub use error::{Error, Result};
