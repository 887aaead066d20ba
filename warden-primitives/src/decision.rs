//! Authorization decision returned by every evaluation path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Terminal answer to an authorization question.
///
/// Decisions are always fully populated; the absence of a decision is never
/// distinguishable from a deny anywhere in the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    allow: bool,
    reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filtered_parameters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audit_id: Option<String>,
    #[serde(default)]
    cache_ttl: u64,
}

impl AuthorizationDecision {
    /// Creates an allow decision.
    #[must_use]
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allow: true,
            reason: reason.into(),
            filtered_parameters: None,
            audit_id: None,
            cache_ttl: 0,
        }
    }

    /// Creates a deny decision.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: reason.into(),
            filtered_parameters: None,
            audit_id: None,
            cache_ttl: 0,
        }
    }

    /// Creates the fail-closed decision used on every error path: deny with
    /// a zero cache TTL so the result is never stored or served stale.
    #[must_use]
    pub fn fail_closed(reason: impl Into<String>) -> Self {
        Self::deny(reason)
    }

    /// Sets the cache TTL in seconds.
    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.cache_ttl = ttl_secs;
        self
    }

    /// Attaches the redacted parameter echo produced by the oracle.
    #[must_use]
    pub fn with_filtered_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.filtered_parameters = Some(parameters);
        self
    }

    /// Attaches the audit correlation identifier.
    #[must_use]
    pub fn with_audit_id(mut self, audit_id: impl Into<String>) -> Self {
        self.audit_id = Some(audit_id.into());
        self
    }

    /// Returns true when the action is permitted.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.allow
    }

    /// Returns the human-readable reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the redacted parameter echo, when present.
    #[must_use]
    pub fn filtered_parameters(&self) -> Option<&Map<String, Value>> {
        self.filtered_parameters.as_ref()
    }

    /// Returns the audit correlation identifier, when present.
    #[must_use]
    pub fn audit_id(&self) -> Option<&str> {
        self.audit_id.as_deref()
    }

    /// Returns the cache TTL in seconds. Zero means the decision must not be
    /// cached.
    #[must_use]
    pub const fn cache_ttl(&self) -> u64 {
        self.cache_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_closed_has_zero_ttl() {
        let decision = AuthorizationDecision::fail_closed("oracle unreachable");
        assert!(!decision.is_allowed());
        assert_eq!(decision.cache_ttl(), 0);
    }

    #[test]
    fn builder_attaches_metadata() {
        let mut params = Map::new();
        params.insert("query".into(), Value::from("[redacted]"));

        let decision = AuthorizationDecision::allow("role permits invocation")
            .with_cache_ttl(300)
            .with_filtered_parameters(params)
            .with_audit_id("audit-42");

        assert!(decision.is_allowed());
        assert_eq!(decision.cache_ttl(), 300);
        assert_eq!(decision.audit_id(), Some("audit-42"));
        assert!(decision.filtered_parameters().is_some());
    }

    #[test]
    fn round_trips_through_json() {
        let decision = AuthorizationDecision::deny("lacking role").with_cache_ttl(60);
        let json = serde_json::to_string(&decision).unwrap();
        let parsed: AuthorizationDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, decision);
    }
}
