//! Whitelisted authorization actions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Verb describing what the principal is asking to do.
///
/// Actions form a closed whitelist: unknown strings are rejected at
/// construction rather than deferred to the policy oracle. The `a2a:` prefix
/// admits any non-empty message type, covering the agent-to-agent family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    /// Invoke a tool exposed through the gateway.
    ToolInvoke,
    /// List the servers visible through the gateway.
    ServerList,
    /// Register a new server with the gateway.
    ServerRegister,
    /// Agent-to-agent operation carrying the message type as suffix.
    AgentToAgent(String),
}

impl Action {
    /// Parses an action string against the whitelist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAction`] when the string is not whitelisted.
    pub fn parse(action: &str) -> Result<Self> {
        match action {
            "gateway:tool:invoke" => Ok(Self::ToolInvoke),
            "gateway:server:list" => Ok(Self::ServerList),
            "server:register" => Ok(Self::ServerRegister),
            other => {
                if let Some(suffix) = other.strip_prefix("a2a:") {
                    if suffix.trim().is_empty() {
                        return Err(Error::InvalidAction {
                            action: other.to_owned(),
                            reason: "a2a action requires a message type suffix".into(),
                        });
                    }
                    return Ok(Self::AgentToAgent(suffix.to_owned()));
                }
                Err(Error::InvalidAction {
                    action: other.to_owned(),
                    reason: "action is not on the whitelist".into(),
                })
            }
        }
    }

    /// Constructs the A2A action for the supplied message type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAction`] when the message type is empty.
    pub fn agent_to_agent(message_type: impl Into<String>) -> Result<Self> {
        let message_type = message_type.into();
        if message_type.trim().is_empty() {
            return Err(Error::InvalidAction {
                action: "a2a:".into(),
                reason: "a2a action requires a message type suffix".into(),
            });
        }
        Ok(Self::AgentToAgent(message_type))
    }

    /// Returns true for actions in the agent-to-agent family.
    #[must_use]
    pub const fn is_agent_to_agent(&self) -> bool {
        matches!(self, Self::AgentToAgent(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolInvoke => f.write_str("gateway:tool:invoke"),
            Self::ServerList => f.write_str("gateway:server:list"),
            Self::ServerRegister => f.write_str("server:register"),
            Self::AgentToAgent(message_type) => write!(f, "a2a:{message_type}"),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Action> for String {
    fn from(value: Action) -> Self {
        value.to_string()
    }
}
