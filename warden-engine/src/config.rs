//! Engine configuration.

use warden_primitives::SensitivityLevel;

use crate::error::{EngineError, EngineResult};

/// Tunable limits and defaults for [`AuthorizationEngine`](crate::AuthorizationEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    max_delegation_depth: u64,
    agent_cache_ttl_secs: u64,
    default_sensitivity: SensitivityLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_delegation_depth: 2,
            agent_cache_ttl_secs: 60,
            default_sensitivity: SensitivityLevel::Medium,
        }
    }
}

impl EngineConfig {
    /// Default limits: delegation chains of at most two hops, 60 second
    /// agent decision lifetime, medium sensitivity when a resource declares
    /// none.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the maximum agent delegation depth.
    #[must_use]
    pub const fn with_max_delegation_depth(mut self, depth: u64) -> Self {
        self.max_delegation_depth = depth;
        self
    }

    /// Overrides the cache lifetime applied to agent-to-agent decisions.
    #[must_use]
    pub const fn with_agent_cache_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.agent_cache_ttl_secs = ttl_secs;
        self
    }

    /// Overrides the sensitivity assumed for resources that declare none.
    #[must_use]
    pub const fn with_default_sensitivity(mut self, sensitivity: SensitivityLevel) -> Self {
        self.default_sensitivity = sensitivity;
        self
    }

    /// Checks the configuration for values that would weaken enforcement.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] when the agent decision
    /// lifetime is zero, which would disable agent decision caching
    /// silently.
    pub fn validate(&self) -> EngineResult<()> {
        if self.agent_cache_ttl_secs == 0 {
            return Err(EngineError::configuration(
                "agent cache ttl must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Maximum allowed agent delegation depth.
    #[must_use]
    pub const fn max_delegation_depth(&self) -> u64 {
        self.max_delegation_depth
    }

    /// Cache lifetime in seconds for agent-to-agent decisions.
    #[must_use]
    pub const fn agent_cache_ttl_secs(&self) -> u64 {
        self.agent_cache_ttl_secs
    }

    /// Sensitivity assumed when a resource declares none.
    #[must_use]
    pub const fn default_sensitivity(&self) -> SensitivityLevel {
        self.default_sensitivity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_agent_ttl_is_rejected() {
        let config = EngineConfig::new().with_agent_cache_ttl_secs(0);
        assert!(config.validate().is_err());
    }
}
