//! Shared error definitions for decision contracts.

use thiserror::Error;

/// Result alias used throughout the contract types.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing contract values.
#[derive(Debug, Error)]
pub enum Error {
    /// The supplied action string is not on the closed whitelist.
    #[error("invalid action `{action}`: {reason}")]
    InvalidAction {
        /// The offending action string.
        action: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Principal record failed validation.
    #[error("invalid principal: {reason}")]
    InvalidPrincipal {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool or server descriptor failed validation.
    #[error("invalid resource: {reason}")]
    InvalidResource {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Agent context or A2A request failed validation.
    #[error("invalid agent context: {reason}")]
    InvalidAgent {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
