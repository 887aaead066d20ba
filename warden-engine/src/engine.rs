//! The authorization orchestrator.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use warden_cache::{CacheLookup, DecisionCache, Revalidate};
use warden_oracle::PolicyOracle;
use warden_plugins::{PluginContext, PluginDecision, PluginManager};
use warden_primitives::{
    A2ARequest, AgentContext, AuthorizationDecision, AuthorizationInput, TrustLevel,
};

use crate::audit::{AuditEntry, AuditSink, TracingAuditSink};
use crate::config::EngineConfig;

/// Reachability of the engine's dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineHealth {
    /// Whether the policy oracle answered its health probe.
    pub oracle: bool,
    /// Whether the decision store answered its health probe.
    pub cache: bool,
}

impl EngineHealth {
    /// True when every dependency is reachable.
    #[must_use]
    pub const fn healthy(&self) -> bool {
        self.oracle && self.cache
    }
}

/// Orchestrates one authorization flow: static rules, cache lookup, the
/// plugin chain, and finally the remote oracle.
///
/// Both entry points return a decision for every input. Failures anywhere in
/// the flow deny rather than propagate, and error-path denies carry a zero
/// cache TTL so they are never stored or served stale.
pub struct AuthorizationEngine {
    oracle: Arc<dyn PolicyOracle>,
    cache: Arc<DecisionCache>,
    plugins: Arc<PluginManager>,
    audit: Arc<dyn AuditSink>,
    config: EngineConfig,
}

impl AuthorizationEngine {
    /// Assembles an engine from its collaborators.
    #[must_use]
    pub fn new(
        oracle: Arc<dyn PolicyOracle>,
        cache: Arc<DecisionCache>,
        plugins: Arc<PluginManager>,
        config: EngineConfig,
    ) -> Self {
        Self {
            oracle,
            cache,
            plugins,
            audit: Arc::new(TracingAuditSink),
            config,
        }
    }

    /// Replaces the default tracing audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Registers this engine as the cache's revalidation hook so stale
    /// entries are refreshed through the full evaluation flow.
    pub fn enable_revalidation(self: &Arc<Self>) {
        self.cache
            .set_revalidator(Arc::clone(self) as Arc<dyn Revalidate>);
    }

    /// Authorizes a gateway request.
    pub async fn authorize(&self, input: &AuthorizationInput) -> AuthorizationDecision {
        let started = Instant::now();
        let lookup = CacheLookup::for_input(input);

        if let Some(decision) = self.cache.get(&lookup).await {
            self.record(input, &decision, true, started).await;
            return decision;
        }

        let (decision, cacheable) = self.decide(input).await;
        let decision = Self::ensure_audit_id(decision);
        if cacheable {
            self.cache.set(&lookup, &decision, None).await;
        }
        self.record(input, &decision, false, started).await;
        decision
    }

    /// Authorizes an agent-to-agent request.
    ///
    /// Static trust rules run before anything else; a structural violation
    /// is denied without touching the cache, plugins, or oracle.
    pub async fn authorize_agent(
        &self,
        agent: &AgentContext,
        request: &A2ARequest,
    ) -> AuthorizationDecision {
        let started = Instant::now();
        let action = format!("a2a:{}", request.message_type());

        if let Some(denial) = self.static_denial(agent, request) {
            let denial = Self::ensure_audit_id(denial);
            self.record_agent(agent, request, &action, &denial, false, started)
                .await;
            return denial;
        }

        let input = match AuthorizationInput::for_agent(agent, request) {
            Ok(input) => input,
            Err(err) => {
                warn!(agent = %agent.agent_id(), ?err, "agent request rejected as malformed");
                let denial = Self::ensure_audit_id(AuthorizationDecision::fail_closed(format!(
                    "invalid agent request: {err}"
                )));
                self.record_agent(agent, request, &action, &denial, false, started)
                    .await;
                return denial;
            }
        };

        self.authorize(&input).await
    }

    /// Probes the oracle and the decision store.
    pub async fn health(&self) -> EngineHealth {
        EngineHealth {
            oracle: self.oracle.health_check().await,
            cache: self.cache.health_check().await,
        }
    }

    /// Evaluates the plugin chain and, when it passes, the oracle.
    ///
    /// Returns the decision and whether it may be cached. Plugin denies and
    /// oracle failures are never cached; only a verdict the oracle actually
    /// produced is.
    async fn decide(&self, input: &AuthorizationInput) -> (AuthorizationDecision, bool) {
        let context = Self::plugin_context_for(input);
        let verdicts = self.plugins.evaluate_all(&context).await;
        if let Some(deny) = verdicts.iter().find(|verdict| !verdict.is_allowed()) {
            debug!(
                plugin = %deny.plugin_name(),
                action = %input.action(),
                "plugin chain denied request"
            );
            return (self.plugin_denial(deny, input), false);
        }

        match self.oracle.query(input).await {
            Ok(decision) => {
                let ttl = self.ttl_for(input);
                (decision.with_cache_ttl(ttl), true)
            }
            Err(err) => {
                warn!(action = %input.action(), %err, "oracle query failed; denying");
                (
                    AuthorizationDecision::fail_closed(format!("policy evaluation failed: {err}")),
                    false,
                )
            }
        }
    }

    /// Turns a plugin verdict into the terminal decision. A verdict a plugin
    /// produced deliberately carries the normal TTL; one synthesized from a
    /// plugin fault or timeout carries zero like every other error path.
    fn plugin_denial(
        &self,
        verdict: &PluginDecision,
        input: &AuthorizationInput,
    ) -> AuthorizationDecision {
        let reason = format!(
            "denied by plugin {}: {}",
            verdict.plugin_name(),
            verdict.reason()
        );
        let faulted = verdict.metadata().contains_key("error")
            || verdict.metadata().contains_key("timeout");
        if faulted {
            AuthorizationDecision::fail_closed(reason)
        } else {
            AuthorizationDecision::deny(reason).with_cache_ttl(self.ttl_for(input))
        }
    }

    /// Static agent trust rules, cheapest first. Returns the denial when one
    /// fires.
    fn static_denial(
        &self,
        agent: &AgentContext,
        request: &A2ARequest,
    ) -> Option<AuthorizationDecision> {
        if agent.trust_level() == TrustLevel::Untrusted
            && agent.environment() != request.target_environment()
        {
            return Some(AuthorizationDecision::deny(
                "untrusted agents cannot communicate across environments",
            ));
        }
        if !agent.has_capability(request.capability()) {
            return Some(AuthorizationDecision::deny(format!(
                "agent lacks required capability: {}",
                request.capability()
            )));
        }
        if request.delegation_depth() > self.config.max_delegation_depth() {
            return Some(AuthorizationDecision::deny(format!(
                "maximum delegation depth exceeded: {} > {}",
                request.delegation_depth(),
                self.config.max_delegation_depth()
            )));
        }
        if agent.is_rate_limited() {
            return Some(AuthorizationDecision::deny("agent is currently rate limited"));
        }
        None
    }

    /// Cache lifetime for a decision on this input: the fixed agent tier for
    /// agent traffic, otherwise the sensitivity tier of the targeted
    /// resource.
    fn ttl_for(&self, input: &AuthorizationInput) -> u64 {
        if input.action().is_agent_to_agent() {
            return self.config.agent_cache_ttl_secs();
        }
        input
            .sensitivity()
            .unwrap_or_else(|| self.config.default_sensitivity())
            .cache_ttl_secs()
    }

    fn plugin_context_for(input: &AuthorizationInput) -> PluginContext {
        let mut context = PluginContext::new(
            input.principal().id(),
            input.action().to_string(),
            input.resource_id(),
        )
        .with_environment(input.context().clone());
        if let Some(capability) = input.context().get("capability").and_then(Value::as_str) {
            context = context.with_capability(capability);
        }
        context
    }

    fn ensure_audit_id(decision: AuthorizationDecision) -> AuthorizationDecision {
        if decision.audit_id().is_some() {
            decision
        } else {
            decision.with_audit_id(Uuid::new_v4().to_string())
        }
    }

    async fn record(
        &self,
        input: &AuthorizationInput,
        decision: &AuthorizationDecision,
        cache_hit: bool,
        started: Instant,
    ) {
        self.audit
            .record(AuditEntry::new(
                input.principal().id(),
                input.action().to_string(),
                input.resource_id(),
                decision.is_allowed(),
                decision.reason(),
                cache_hit,
                started.elapsed(),
                decision.audit_id().map(str::to_owned),
            ))
            .await;
    }

    async fn record_agent(
        &self,
        agent: &AgentContext,
        request: &A2ARequest,
        action: &str,
        decision: &AuthorizationDecision,
        cache_hit: bool,
        started: Instant,
    ) {
        self.audit
            .record(AuditEntry::new(
                agent.agent_id(),
                action,
                request.target_agent_id(),
                decision.is_allowed(),
                decision.reason(),
                cache_hit,
                started.elapsed(),
                decision.audit_id().map(str::to_owned),
            ))
            .await;
    }
}

/// Stale entries are refreshed by replaying the input stored with the entry
/// through the same plugin-then-oracle flow the original decision took. An
/// entry with no stored input is left to age out, and so is a refresh that
/// denies on an error path.
#[async_trait]
impl Revalidate for AuthorizationEngine {
    async fn refresh(&self, lookup: &CacheLookup) -> Option<AuthorizationDecision> {
        let Some(input) = lookup.input() else {
            debug!(key = %lookup.key(), "no stored input, skipping revalidation");
            return None;
        };
        let (decision, cacheable) = self.decide(input).await;
        cacheable.then_some(decision)
    }
}
