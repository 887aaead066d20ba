//! Error types for decision storage backends.

use thiserror::Error;

/// Errors surfaced by [`DecisionStore`](crate::DecisionStore) backends and the
/// cache layer built on top of them.
///
/// Store failures never propagate out of the cache as authorization failures.
/// The cache logs them and degrades to a miss so the caller re-evaluates.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected its configuration.
    #[error("invalid store configuration: {reason}")]
    Configuration {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The backend failed to serve a read or write.
    #[error("store backend error: {reason}")]
    Backend {
        /// Underlying backend failure.
        reason: String,
    },

    /// A cached entry could not be serialized or parsed.
    #[error("cache entry serialization failed: {source}")]
    Serialization {
        /// Underlying serde error.
        #[from]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Convenience constructor for [`StoreError::Configuration`].
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`StoreError::Backend`].
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
