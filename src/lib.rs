//! age-plugin-ledger library crate: the device protocol, host client and
//! file-key wrapping.
//!
//! Modules are public so that the binary and the `tests/` integration tests
//! share one implementation.

pub mod apdu;
pub mod client;
pub mod config;
pub mod crypto;
pub mod device;
pub mod error;
pub mod identity;
pub mod keys;
pub mod transport;
pub mod wrap;
