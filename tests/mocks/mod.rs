//! Shared fixtures for the integration tests
//!
//! A fake provider served over HTTP plus canned payloads and settings.

pub mod fixtures;
pub mod test_server;

#[allow(unused_imports)]
pub use test_server::TestServer;
