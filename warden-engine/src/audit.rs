//! Audit trail for authorization decisions.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

/// One audited authorization outcome.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    principal_id: String,
    action: String,
    resource: String,
    allowed: bool,
    reason: String,
    cache_hit: bool,
    elapsed: Duration,
    audit_id: Option<String>,
}

impl AuditEntry {
    /// Builds an audit entry for one decision.
    #[allow(clippy::fn_params_excessive_bools, clippy::too_many_arguments)]
    pub(crate) fn new(
        principal_id: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        allowed: bool,
        reason: impl Into<String>,
        cache_hit: bool,
        elapsed: Duration,
        audit_id: Option<String>,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            action: action.into(),
            resource: resource.into(),
            allowed,
            reason: reason.into(),
            cache_hit,
            elapsed,
            audit_id,
        }
    }

    /// Principal the decision applied to.
    #[must_use]
    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Action that was evaluated.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Resource the action targeted.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Whether the action was permitted.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Reason attached to the decision.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Whether the decision was served from cache.
    #[must_use]
    pub const fn cache_hit(&self) -> bool {
        self.cache_hit
    }

    /// Wall time spent reaching the decision.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Correlation identifier attached to the decision, when present.
    #[must_use]
    pub fn audit_id(&self) -> Option<&str> {
        self.audit_id.as_deref()
    }
}

/// Receives one entry per authorization decision, cache hits included.
///
/// Sinks must not fail the decision path; a sink that cannot persist an
/// entry should log and drop it.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records one decision.
    async fn record(&self, entry: AuditEntry);
}

/// Default sink writing structured events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) {
        info!(
            principal = %entry.principal_id(),
            action = %entry.action(),
            resource = %entry.resource(),
            allowed = entry.is_allowed(),
            reason = %entry.reason(),
            cache_hit = entry.cache_hit(),
            elapsed_ms = entry.elapsed().as_millis() as u64,
            audit_id = entry.audit_id().unwrap_or("-"),
            "authorization decision"
        );
    }
}
