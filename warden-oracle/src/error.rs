//! Error types for the policy oracle client.

use std::time::Duration;

use thiserror::Error;

/// Result alias used by the oracle client.
pub type OracleResult<T> = Result<T, OracleError>;

/// Errors raised while talking to the remote policy oracle.
///
/// These never cross the engine boundary: every variant collapses into a
/// fail-closed deny decision before a caller sees it.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The client is misconfigured (bad endpoint or path).
    #[error("oracle not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// Transport-level failure (connection refused, DNS, TLS).
    #[error("oracle transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The evaluation call exceeded its bounded timeout.
    #[error("oracle request timed out after {timeout:?}")]
    Timeout {
        /// The configured request timeout.
        timeout: Duration,
    },

    /// The oracle answered with a non-success status or malformed body.
    #[error("oracle response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },
}

impl OracleError {
    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for response failures.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}
