//! Error types for plugin registration and lifecycle.

use thiserror::Error;

/// Errors raised while managing the plugin registry.
///
/// Evaluation itself never surfaces these; a plugin that fails while
/// evaluating is translated into a deny decision instead.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin with the same name is already registered.
    #[error("plugin already registered: {name}")]
    Duplicate {
        /// Name of the conflicting plugin.
        name: String,
    },

    /// No plugin with the given name is registered.
    #[error("plugin not registered: {name}")]
    NotRegistered {
        /// Name that was looked up.
        name: String,
    },

    /// The plugin rejected the configuration it was given.
    #[error("invalid configuration for plugin {name}: {reason}")]
    Configuration {
        /// Plugin that rejected the configuration.
        name: String,
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The plugin's load hook failed. The plugin stays registered but
    /// disabled.
    #[error("plugin {name} failed to load: {reason}")]
    Load {
        /// Plugin whose load hook failed.
        name: String,
        /// Failure reported by the hook.
        reason: String,
    },

    /// A plugin reported an internal failure while evaluating.
    #[error("plugin {name} evaluation failed: {reason}")]
    Evaluation {
        /// Plugin that failed.
        name: String,
        /// Failure reported by the plugin.
        reason: String,
    },
}

impl PluginError {
    /// Convenience constructor for [`PluginError::Duplicate`].
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::Duplicate { name: name.into() }
    }

    /// Convenience constructor for [`PluginError::NotRegistered`].
    pub fn not_registered(name: impl Into<String>) -> Self {
        Self::NotRegistered { name: name.into() }
    }

    /// Convenience constructor for [`PluginError::Configuration`].
    pub fn configuration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`PluginError::Load`].
    pub fn load(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`PluginError::Evaluation`].
    pub fn evaluation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
