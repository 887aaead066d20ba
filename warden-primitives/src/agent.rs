//! Agent identity and agent-to-agent request contracts.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Broad classification of an autonomous agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// Long-running service agent.
    Service,
    /// Task-scoped worker agent.
    Worker,
    /// Read-only query agent.
    Query,
}

/// Trust classification gating cross-environment and delegation behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Fully trusted; bypasses the cross-environment restriction.
    Trusted,
    /// Partially trusted.
    Limited,
    /// Untrusted; confined to its own environment.
    Untrusted,
}

/// Identity and standing of the agent originating a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContext {
    agent_id: String,
    agent_type: AgentType,
    trust_level: TrustLevel,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    capabilities: BTreeSet<String>,
    environment: String,
    #[serde(default)]
    rate_limited: bool,
}

impl AgentContext {
    /// Creates an agent context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAgent`] when the agent id or environment is
    /// empty.
    pub fn new(
        agent_id: impl Into<String>,
        agent_type: AgentType,
        trust_level: TrustLevel,
        environment: impl Into<String>,
    ) -> Result<Self> {
        let agent_id = agent_id.into();
        if agent_id.trim().is_empty() {
            return Err(Error::InvalidAgent {
                reason: "agent id cannot be empty".into(),
            });
        }
        let environment = environment.into();
        if environment.trim().is_empty() {
            return Err(Error::InvalidAgent {
                reason: "environment cannot be empty".into(),
            });
        }

        Ok(Self {
            agent_id,
            agent_type,
            trust_level,
            capabilities: BTreeSet::new(),
            environment,
            rate_limited: false,
        })
    }

    /// Adds a declared capability, ignoring empty strings.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        let capability = capability.into();
        if !capability.trim().is_empty() {
            self.capabilities.insert(capability);
        }
        self
    }

    /// Adds multiple declared capabilities.
    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for capability in capabilities {
            self = self.with_capability(capability);
        }
        self
    }

    /// Marks the agent as currently rate limited.
    #[must_use]
    pub const fn rate_limited(mut self, limited: bool) -> Self {
        self.rate_limited = limited;
        self
    }

    /// Returns the agent identifier.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Returns the agent classification.
    #[must_use]
    pub const fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    /// Returns the trust classification.
    #[must_use]
    pub const fn trust_level(&self) -> TrustLevel {
        self.trust_level
    }

    /// Returns the declared capability set.
    #[must_use]
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    /// Returns true when the agent declares the supplied capability.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Returns the operating environment.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Returns whether the agent is currently rate limited.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        self.rate_limited
    }
}

/// Agent-to-agent authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct A2ARequest {
    source_agent_id: String,
    target_agent_id: String,
    capability: String,
    message_type: String,
    target_environment: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    context: Map<String, Value>,
}

impl A2ARequest {
    /// Creates an A2A request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAgent`] when any required field is empty.
    pub fn new(
        source_agent_id: impl Into<String>,
        target_agent_id: impl Into<String>,
        capability: impl Into<String>,
        message_type: impl Into<String>,
        target_environment: impl Into<String>,
    ) -> Result<Self> {
        let source_agent_id = source_agent_id.into();
        let target_agent_id = target_agent_id.into();
        let capability = capability.into();
        let message_type = message_type.into();
        let target_environment = target_environment.into();

        for (field, value) in [
            ("source agent id", &source_agent_id),
            ("target agent id", &target_agent_id),
            ("capability", &capability),
            ("message type", &message_type),
            ("target environment", &target_environment),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidAgent {
                    reason: format!("{field} cannot be empty"),
                });
            }
        }

        Ok(Self {
            source_agent_id,
            target_agent_id,
            capability,
            message_type,
            target_environment,
            context: Map::new(),
        })
    }

    /// Adds a context entry to the request.
    #[must_use]
    pub fn with_context_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Returns the source agent identifier.
    #[must_use]
    pub fn source_agent_id(&self) -> &str {
        &self.source_agent_id
    }

    /// Returns the target agent identifier.
    #[must_use]
    pub fn target_agent_id(&self) -> &str {
        &self.target_agent_id
    }

    /// Returns the requested capability.
    #[must_use]
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Returns the A2A message type.
    #[must_use]
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Returns the environment of the target agent.
    #[must_use]
    pub fn target_environment(&self) -> &str {
        &self.target_environment
    }

    /// Returns the request context map.
    #[must_use]
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Returns the delegation depth carried in the context, zero when absent
    /// or non-numeric.
    #[must_use]
    pub fn delegation_depth(&self) -> u64 {
        self.context
            .get("delegation_depth")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentContext {
        AgentContext::new("agent-1", AgentType::Worker, TrustLevel::Untrusted, "development")
            .unwrap()
            .with_capabilities(["search", "summarize"])
    }

    #[test]
    fn capability_membership() {
        let agent = agent();
        assert!(agent.has_capability("search"));
        assert!(!agent.has_capability("deploy"));
    }

    #[test]
    fn delegation_depth_defaults_to_zero() {
        let request =
            A2ARequest::new("agent-1", "agent-2", "search", "task_request", "development")
                .unwrap();
        assert_eq!(request.delegation_depth(), 0);

        let request = request.with_context_value("delegation_depth", Value::from(3));
        assert_eq!(request.delegation_depth(), 3);
    }

    #[test]
    fn rejects_empty_fields() {
        let err = A2ARequest::new("", "agent-2", "search", "task_request", "development")
            .expect_err("empty source");
        assert!(matches!(err, Error::InvalidAgent { .. }));
    }
}
