//! Policy engine walkthrough: wires the engine against an in-process oracle
//! and runs a handful of gateway and agent-to-agent checks.
//!
//! Point `WARDEN_OPA_URL` at a running OPA instance to evaluate against a
//! real oracle instead of the built-in role stub.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use warden_cache::{CacheConfig, DecisionCache, MemoryStore};
use warden_engine::{AuthorizationEngine, EngineConfig};
use warden_oracle::{OracleClient, OracleConfig, OracleResult, PolicyOracle};
use warden_plugins::{PluginContext, PluginDecision, PluginManager, PluginResult, PolicyPlugin};
use warden_primitives::{
    A2ARequest, AgentContext, AgentType, AuthorizationDecision, AuthorizationInput, Principal,
    SensitivityLevel, ToolRef, TrustLevel,
};

/// Stand-in oracle: admins may do anything, developers may invoke tools.
struct RoleOracle;

#[async_trait]
impl PolicyOracle for RoleOracle {
    async fn query(&self, input: &AuthorizationInput) -> OracleResult<AuthorizationDecision> {
        let role = input.principal().role();
        let allowed = role == "admin" || role == "developer" || role == "agent";
        Ok(if allowed {
            AuthorizationDecision::allow(format!("role {role} permits this action"))
        } else {
            AuthorizationDecision::deny(format!("role {role} is not permitted"))
        })
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Denies any tool marked critical outside of an explicit allow list.
struct CriticalToolGate;

#[async_trait]
impl PolicyPlugin for CriticalToolGate {
    fn name(&self) -> &str {
        "critical-tool-gate"
    }

    fn priority(&self) -> u32 {
        10
    }

    async fn evaluate(&self, context: &PluginContext) -> PluginResult<PluginDecision> {
        if context.resource() == "prod-deploy" {
            Ok(PluginDecision::deny(
                self.name(),
                "prod-deploy is gated behind change management",
            ))
        } else {
            Ok(PluginDecision::allow(self.name(), "tool is not gated"))
        }
    }
}

fn build_oracle() -> Result<Arc<dyn PolicyOracle>> {
    match std::env::var("WARDEN_OPA_URL") {
        Ok(url) => {
            info!(%url, "using remote policy oracle");
            Ok(Arc::new(OracleClient::new(OracleConfig::new(url)?)?))
        }
        Err(_) => {
            info!("WARDEN_OPA_URL not set, using built-in role oracle");
            Ok(Arc::new(RoleOracle))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cache = Arc::new(DecisionCache::new(
        Arc::new(MemoryStore::new()),
        CacheConfig::new(),
    ));
    let plugins = Arc::new(PluginManager::new());
    plugins.register(Arc::new(CriticalToolGate), None).await?;

    let engine = Arc::new(AuthorizationEngine::new(
        build_oracle()?,
        Arc::clone(&cache),
        plugins,
        EngineConfig::new(),
    ));
    engine.enable_revalidation();

    let developer = Principal::new("dev-1", "dev@example.com", "developer")?;

    // Routine tool invocation: allowed, cached with the internal tier.
    let search = ToolRef::new("search", SensitivityLevel::Internal)?;
    let input = AuthorizationInput::for_tool_invocation(developer.clone(), search);
    let decision = engine.authorize(&input).await;
    info!(allowed = decision.is_allowed(), reason = decision.reason(), "tool invocation");

    // Same request again: served from the cache.
    let decision = engine.authorize(&input).await;
    info!(allowed = decision.is_allowed(), "tool invocation (repeat)");

    // A gated tool: the plugin chain denies before the oracle runs.
    let deploy = ToolRef::new("prod-deploy", SensitivityLevel::Critical)?;
    let input = AuthorizationInput::for_tool_invocation(developer, deploy);
    let decision = engine.authorize(&input).await;
    info!(allowed = decision.is_allowed(), reason = decision.reason(), "gated tool");

    // Agent-to-agent: an untrusted agent may not cross environments.
    let agent = AgentContext::new("agent-1", AgentType::Worker, TrustLevel::Untrusted, "staging")?
        .with_capability("data_query");
    let request = A2ARequest::new("agent-1", "agent-2", "data_query", "task_request", "production")?;
    let decision = engine.authorize_agent(&agent, &request).await;
    info!(allowed = decision.is_allowed(), reason = decision.reason(), "cross-env a2a");

    // Same agent within its own environment passes the static rules.
    let request = A2ARequest::new("agent-1", "agent-2", "data_query", "task_request", "staging")?;
    let decision = engine.authorize_agent(&agent, &request).await;
    info!(allowed = decision.is_allowed(), reason = decision.reason(), "same-env a2a");

    // Delegation chains longer than the configured limit are refused.
    let deep = A2ARequest::new("agent-1", "agent-2", "data_query", "task_request", "staging")?
        .with_context_value("delegation_depth", serde_json::Value::from(3));
    let decision = engine.authorize_agent(&agent, &deep).await;
    info!(allowed = decision.is_allowed(), reason = decision.reason(), "deep delegation");

    let metrics = cache.metrics().await;
    info!(
        hits = metrics.hits,
        misses = metrics.misses,
        stale_hits = metrics.stale_hits,
        hit_rate = metrics.hit_rate,
        "cache metrics"
    );

    let health = engine.health().await;
    info!(oracle = health.oracle, cache = health.cache, "engine health");

    Ok(())
}
