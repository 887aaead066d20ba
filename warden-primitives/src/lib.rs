//! Core shared contracts for the Warden policy decision engine.

#![warn(missing_docs, clippy::pedantic)]

mod action;
mod agent;
mod decision;
mod error;
mod input;
mod principal;
mod resource;

/// Whitelisted authorization verbs.
pub use action::Action;
/// Agent identity, trust levels, and agent-to-agent requests.
pub use agent::{A2ARequest, AgentContext, AgentType, TrustLevel};
/// Terminal authorization decision.
pub use decision::AuthorizationDecision;
/// Error type and result alias shared across the contracts.
pub use error::{Error, Result};
/// Immutable evaluation input.
pub use input::AuthorizationInput;
/// Normalized principal identity.
pub use principal::Principal;
/// Governed resource descriptors and sensitivity tiers.
pub use resource::{SensitivityLevel, ServerRef, ToolRef};
