//! Engine error types.

use thiserror::Error;

/// Errors raised while constructing or configuring the engine.
///
/// Authorization itself never returns these: every evaluation path collapses
/// its failures into a deny decision.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine configuration is invalid.
    #[error("invalid engine configuration: {reason}")]
    Configuration {
        /// Why validation rejected the configuration.
        reason: String,
    },
}

impl EngineError {
    /// Convenience constructor for [`EngineError::Configuration`].
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
