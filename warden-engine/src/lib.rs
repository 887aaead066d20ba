//! Authorization orchestration for the Warden policy engine.
//!
//! [`AuthorizationEngine`] ties the pieces together: static agent trust
//! rules, the decision cache, the local plugin chain, and the remote policy
//! oracle. Every entry point returns a decision; failures deny.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

mod audit;
mod config;
mod engine;
mod error;

pub use audit::{AuditEntry, AuditSink, TracingAuditSink};
pub use config::EngineConfig;
pub use engine::{AuthorizationEngine, EngineHealth};
pub use error::{EngineError, EngineResult};
