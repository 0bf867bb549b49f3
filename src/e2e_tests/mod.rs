//! End-to-end tests against a scripted SMB1 server

pub mod mock_server;

// Test scenario modules
pub mod failure_tests;

pub use mock_server::{MockConfig, MockSmbServer};
