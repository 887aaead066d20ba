//! The policy plugin contract.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::PluginResult;

/// Request snapshot handed to every plugin in the chain.
///
/// Plugins receive the same immutable context; evaluation must not mutate
/// shared state based on it. The timestamp is captured once when the context
/// is built so every plugin in one chain run sees the same instant.
#[derive(Debug, Clone)]
pub struct PluginContext {
    principal_id: String,
    action: String,
    resource: String,
    capability: Option<String>,
    arguments: Map<String, Value>,
    environment: Map<String, Value>,
    timestamp: u64,
}

impl PluginContext {
    /// Builds a context for one evaluation pass.
    pub fn new(
        principal_id: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            action: action.into(),
            resource: resource.into(),
            capability: None,
            arguments: Map::new(),
            environment: Map::new(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0),
        }
    }

    /// Sets the capability being exercised, for agent-to-agent traffic.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    /// Attaches the call arguments under evaluation.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Attaches ambient request facts such as source environment or rate
    /// limit state.
    #[must_use]
    pub fn with_environment(mut self, environment: Map<String, Value>) -> Self {
        self.environment = environment;
        self
    }

    /// Principal performing the action.
    #[must_use]
    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Action under evaluation.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Resource the action targets.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Capability being exercised, when this is agent traffic.
    #[must_use]
    pub fn capability(&self) -> Option<&str> {
        self.capability.as_deref()
    }

    /// Call arguments under evaluation.
    #[must_use]
    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// Ambient request facts.
    #[must_use]
    pub fn environment(&self) -> &Map<String, Value> {
        &self.environment
    }

    /// Unix timestamp captured when the context was built.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Verdict returned by one plugin, tagged with the plugin that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDecision {
    plugin_name: String,
    allowed: bool,
    reason: String,
    metadata: Map<String, Value>,
}

impl PluginDecision {
    /// An allow verdict.
    pub fn allow(plugin_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            allowed: true,
            reason: reason.into(),
            metadata: Map::new(),
        }
    }

    /// A deny verdict.
    pub fn deny(plugin_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            allowed: false,
            reason: reason.into(),
            metadata: Map::new(),
        }
    }

    /// A deny verdict standing in for a plugin that failed while evaluating.
    /// The failure description travels in `metadata.error`.
    pub fn denied_error(plugin_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut decision = Self::deny(plugin_name, reason.clone());
        decision.metadata.insert("error".into(), Value::String(reason));
        decision
    }

    /// A deny verdict standing in for a plugin that exceeded its evaluation
    /// deadline, marked with `metadata.timeout = true`.
    pub fn denied_timeout(plugin_name: impl Into<String>, timeout: Duration) -> Self {
        let name = plugin_name.into();
        let mut decision = Self::deny(
            name.clone(),
            format!("plugin {name} timed out after {}s", timeout.as_secs()),
        );
        decision.metadata.insert("timeout".into(), Value::Bool(true));
        decision
    }

    /// Attaches structured detail to the verdict.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Name of the plugin that produced this verdict.
    #[must_use]
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Whether the plugin allowed the action.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Human-readable reason for the verdict.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Structured detail attached to the verdict.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// A pluggable policy check run before the remote oracle is consulted.
///
/// Plugins are evaluated sequentially in ascending priority order; the first
/// deny stops the chain. An `Err` from [`PolicyPlugin::evaluate`] is treated
/// as a deny attributed to the failing plugin, never as an allow.
#[async_trait]
pub trait PolicyPlugin: Send + Sync {
    /// Unique plugin name used for registration and attribution.
    fn name(&self) -> &str;

    /// Plugin version, for diagnostics.
    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Chain position. Lower runs earlier; ties break on name.
    fn priority(&self) -> u32 {
        100
    }

    /// Validates the configuration supplied at registration time.
    fn validate_config(&self, _config: &Map<String, Value>) -> PluginResult<()> {
        Ok(())
    }

    /// Called once when the plugin is registered.
    async fn on_load(&self) -> PluginResult<()> {
        Ok(())
    }

    /// Called once when the plugin is unregistered.
    async fn on_unload(&self) -> PluginResult<()> {
        Ok(())
    }

    /// Evaluates one request.
    async fn evaluate(&self, context: &PluginContext) -> PluginResult<PluginDecision>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_and_timeout_verdicts_deny_with_metadata() {
        let errored = PluginDecision::denied_error("quota", "backend unreachable");
        assert!(!errored.is_allowed());
        assert_eq!(
            errored.metadata().get("error"),
            Some(&Value::String("backend unreachable".into()))
        );

        let timed_out = PluginDecision::denied_timeout("quota", Duration::from_secs(5));
        assert!(!timed_out.is_allowed());
        assert_eq!(timed_out.metadata().get("timeout"), Some(&Value::Bool(true)));
        assert!(timed_out.reason().contains("timed out"));
    }

    #[test]
    fn context_builder_carries_request_facts() {
        let mut environment = Map::new();
        environment.insert("source_environment".into(), Value::from("prod"));

        let context = PluginContext::new("alice", "gateway:tool:invoke", "db")
            .with_capability("data_query")
            .with_environment(environment);

        assert_eq!(context.principal_id(), "alice");
        assert_eq!(context.capability(), Some("data_query"));
        assert!(context.environment().contains_key("source_environment"));
        assert!(context.timestamp() > 0);
    }
}
