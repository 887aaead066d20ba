//! Authorization request input shared by the cache, oracle, and engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::Action;
use crate::agent::{A2ARequest, AgentContext};
use crate::error::Result;
use crate::principal::Principal;
use crate::resource::{SensitivityLevel, ServerRef, ToolRef};

/// Immutable input for a single authorization evaluation.
///
/// Every evaluation path (cache fingerprint, plugin chain, oracle envelope)
/// reads from the same input; nothing mutates it after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationInput {
    #[serde(rename = "user")]
    principal: Principal,
    action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool: Option<ToolRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    server: Option<ServerRef>,
    #[serde(default)]
    context: Map<String, Value>,
}

impl AuthorizationInput {
    /// Creates an input for the supplied principal and action.
    #[must_use]
    pub fn new(principal: Principal, action: Action) -> Self {
        Self {
            principal,
            action,
            tool: None,
            server: None,
            context: Map::new(),
        }
    }

    /// Convenience constructor for a tool invocation check.
    #[must_use]
    pub fn for_tool_invocation(principal: Principal, tool: ToolRef) -> Self {
        Self::new(principal, Action::ToolInvoke).with_tool(tool)
    }

    /// Convenience constructor for a server registration check.
    #[must_use]
    pub fn for_server_registration(principal: Principal, server: ServerRef) -> Self {
        Self::new(principal, Action::ServerRegister).with_server(server)
    }

    /// Builds the oracle input for an agent-to-agent request.
    ///
    /// The source agent becomes the principal and the A2A specifics travel in
    /// the context map so the oracle sees trust level, capability, and target
    /// environment alongside any delegation metadata.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the synthesized principal or action is
    /// invalid.
    pub fn for_agent(agent: &AgentContext, request: &A2ARequest) -> Result<Self> {
        let principal = Principal::new(agent.agent_id(), "", "agent")?;
        let action = Action::agent_to_agent(request.message_type())?;

        let mut input = Self::new(principal, action);
        input.context.insert(
            "source_agent".into(),
            serde_json::json!({
                "id": agent.agent_id(),
                "type": agent.agent_type(),
                "trust_level": agent.trust_level(),
                "capabilities": agent.capabilities(),
                "environment": agent.environment(),
            }),
        );
        input.context.insert(
            "target_agent".into(),
            serde_json::json!({
                "id": request.target_agent_id(),
                "environment": request.target_environment(),
            }),
        );
        input
            .context
            .insert("capability".into(), Value::from(request.capability()));
        for (key, value) in request.context() {
            input.context.insert(key.clone(), value.clone());
        }

        Ok(input)
    }

    /// Attaches the targeted tool descriptor.
    #[must_use]
    pub fn with_tool(mut self, tool: ToolRef) -> Self {
        self.tool = Some(tool);
        self
    }

    /// Attaches the targeted server descriptor.
    #[must_use]
    pub fn with_server(mut self, server: ServerRef) -> Self {
        self.server = Some(server);
        self
    }

    /// Adds a context entry.
    #[must_use]
    pub fn with_context_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Returns the principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Returns the targeted tool descriptor, when present.
    #[must_use]
    pub fn tool(&self) -> Option<&ToolRef> {
        self.tool.as_ref()
    }

    /// Returns the targeted server descriptor, when present.
    #[must_use]
    pub fn server(&self) -> Option<&ServerRef> {
        self.server.as_ref()
    }

    /// Returns the free-form context map.
    #[must_use]
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Returns the resource identifier used for cache keys: the tool name,
    /// else the server name, else the action itself.
    #[must_use]
    pub fn resource_id(&self) -> String {
        if let Some(tool) = &self.tool {
            return tool.name().to_owned();
        }
        if let Some(server) = &self.server {
            return server.name().to_owned();
        }
        self.action.to_string()
    }

    /// Returns the declared sensitivity of the targeted resource, when any
    /// descriptor is attached.
    #[must_use]
    pub fn sensitivity(&self) -> Option<SensitivityLevel> {
        self.tool
            .as_ref()
            .map(ToolRef::sensitivity)
            .or_else(|| self.server.as_ref().map(ServerRef::sensitivity))
    }
}
