//! Fail-closed client for the remote policy oracle.
//!
//! The oracle is an OPA-compatible decision service reached over HTTP. This
//! crate implements the client-side contract only: build the `{"input": …}`
//! envelope, evaluate with a bounded timeout, and collapse every failure
//! into a deny so uncertainty can never become an allow.

#![warn(missing_docs, clippy::pedantic)]

mod client;
mod config;
mod error;

/// HTTP oracle client and the engine-facing oracle trait.
pub use client::{OracleClient, PolicyOracle};
/// Oracle endpoint and timeout configuration.
pub use config::OracleConfig;
/// Error type and result alias for oracle calls.
pub use error::{OracleError, OracleResult};
