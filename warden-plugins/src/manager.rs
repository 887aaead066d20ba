//! Plugin registry and chain evaluation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{PluginError, PluginResult};
use crate::plugin::{PluginContext, PluginDecision, PolicyPlugin};

const DEFAULT_EVALUATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Introspection record for one registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Registered plugin name.
    pub name: String,
    /// Plugin version string.
    pub version: String,
    /// Chain position.
    pub priority: u32,
    /// Whether the plugin currently participates in evaluation.
    pub enabled: bool,
}

/// Holds registered plugins and runs them as an ordered chain.
///
/// Registration and enablement are separate: a plugin whose load hook fails
/// stays registered but disabled, so the operator can see it and retry
/// enabling it once the underlying problem is fixed.
pub struct PluginManager {
    plugins: RwLock<HashMap<String, Arc<dyn PolicyPlugin>>>,
    enabled: RwLock<BTreeSet<String>>,
    evaluation_timeout: Duration,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginManager {
    /// Creates an empty manager with the default five second per-plugin
    /// evaluation deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_EVALUATION_TIMEOUT)
    }

    /// Creates an empty manager with a custom per-plugin evaluation deadline.
    #[must_use]
    pub fn with_timeout(evaluation_timeout: Duration) -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
            enabled: RwLock::new(BTreeSet::new()),
            evaluation_timeout,
        }
    }

    /// Registers a plugin and runs its load hook.
    ///
    /// Fails on a duplicate name or rejected configuration without
    /// registering anything. A load hook failure leaves the plugin
    /// registered but disabled and reports the failure to the caller.
    pub async fn register(
        &self,
        plugin: Arc<dyn PolicyPlugin>,
        config: Option<&Map<String, Value>>,
    ) -> PluginResult<()> {
        let name = plugin.name().to_owned();
        if let Some(config) = config {
            plugin.validate_config(config)?;
        }
        {
            let mut plugins = self.plugins.write().await;
            if plugins.contains_key(&name) {
                return Err(PluginError::duplicate(name));
            }
            plugins.insert(name.clone(), Arc::clone(&plugin));
        }

        match plugin.on_load().await {
            Ok(()) => {
                self.enabled.write().await.insert(name.clone());
                debug!(plugin = %name, version = plugin.version(), "plugin registered");
                Ok(())
            }
            Err(err) => {
                warn!(plugin = %name, ?err, "plugin load hook failed, registered disabled");
                Err(PluginError::load(name, err.to_string()))
            }
        }
    }

    /// Removes a plugin and runs its unload hook. Unload failures are logged
    /// but do not keep the plugin registered.
    pub async fn unregister(&self, name: &str) -> PluginResult<()> {
        let plugin = self
            .plugins
            .write()
            .await
            .remove(name)
            .ok_or_else(|| PluginError::not_registered(name))?;
        self.enabled.write().await.remove(name);

        if let Err(err) = plugin.on_unload().await {
            warn!(plugin = %name, ?err, "plugin unload hook failed");
        }
        Ok(())
    }

    /// Enables a registered plugin.
    pub async fn enable(&self, name: &str) -> PluginResult<()> {
        if !self.plugins.read().await.contains_key(name) {
            return Err(PluginError::not_registered(name));
        }
        self.enabled.write().await.insert(name.to_owned());
        Ok(())
    }

    /// Disables a plugin. Disabling an unknown or already disabled plugin is
    /// a no-op.
    pub async fn disable(&self, name: &str) {
        self.enabled.write().await.remove(name);
    }

    /// Whether the named plugin is currently enabled.
    pub async fn is_enabled(&self, name: &str) -> bool {
        self.enabled.read().await.contains(name)
    }

    /// Names of every registered plugin, sorted.
    pub async fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of every enabled plugin, sorted.
    pub async fn enabled_names(&self) -> Vec<String> {
        self.enabled.read().await.iter().cloned().collect()
    }

    /// Describes registered plugins in chain order for operator
    /// introspection, optionally restricted to enabled ones.
    pub async fn list(&self, enabled_only: bool) -> Vec<PluginDescriptor> {
        let plugins = self.plugins.read().await;
        let enabled = self.enabled.read().await;
        let mut descriptors: Vec<PluginDescriptor> = plugins
            .values()
            .filter(|plugin| !enabled_only || enabled.contains(plugin.name()))
            .map(|plugin| PluginDescriptor {
                name: plugin.name().to_owned(),
                version: plugin.version().to_owned(),
                priority: plugin.priority(),
                enabled: enabled.contains(plugin.name()),
            })
            .collect();
        descriptors.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        descriptors
    }

    /// Runs the enabled plugins against one request.
    ///
    /// Plugins run sequentially in ascending `(priority, name)` order. The
    /// chain stops at the first deny, so later plugins never observe a
    /// request an earlier plugin rejected. A plugin error or timeout becomes
    /// a deny attributed to that plugin and stops the chain the same way.
    /// With no enabled plugins the result is empty, which callers must not
    /// read as an allow on its own.
    pub async fn evaluate_all(&self, context: &PluginContext) -> Vec<PluginDecision> {
        let mut chain: Vec<Arc<dyn PolicyPlugin>> = {
            let plugins = self.plugins.read().await;
            let enabled = self.enabled.read().await;
            enabled
                .iter()
                .filter_map(|name| plugins.get(name).cloned())
                .collect()
        };
        chain.sort_by(|a, b| {
            a.priority()
                .cmp(&b.priority())
                .then_with(|| a.name().cmp(b.name()))
        });

        let mut decisions = Vec::with_capacity(chain.len());
        for plugin in chain {
            let name = plugin.name().to_owned();
            let decision = match timeout(self.evaluation_timeout, plugin.evaluate(context)).await {
                Ok(Ok(decision)) => decision,
                Ok(Err(err)) => {
                    warn!(plugin = %name, ?err, "plugin evaluation failed, denying");
                    PluginDecision::denied_error(&name, err.to_string())
                }
                Err(_elapsed) => {
                    warn!(plugin = %name, "plugin evaluation timed out, denying");
                    PluginDecision::denied_timeout(&name, self.evaluation_timeout)
                }
            };
            let denied = !decision.is_allowed();
            decisions.push(decision);
            if denied {
                break;
            }
        }
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct StaticPlugin {
        name: &'static str,
        priority: u32,
        allow: bool,
        calls: AtomicU64,
    }

    impl StaticPlugin {
        fn new(name: &'static str, priority: u32, allow: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                priority,
                allow,
                calls: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl PolicyPlugin for StaticPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        async fn evaluate(&self, _context: &PluginContext) -> PluginResult<PluginDecision> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if self.allow {
                PluginDecision::allow(self.name, "ok")
            } else {
                PluginDecision::deny(self.name, "rejected")
            })
        }
    }

    struct FailingLoad;

    #[async_trait]
    impl PolicyPlugin for FailingLoad {
        fn name(&self) -> &str {
            "failing-load"
        }

        async fn on_load(&self) -> PluginResult<()> {
            Err(PluginError::load("failing-load", "backend unreachable"))
        }

        async fn evaluate(&self, _context: &PluginContext) -> PluginResult<PluginDecision> {
            Ok(PluginDecision::allow("failing-load", "ok"))
        }
    }

    struct SlowPlugin;

    #[async_trait]
    impl PolicyPlugin for SlowPlugin {
        fn name(&self) -> &str {
            "slow"
        }

        fn priority(&self) -> u32 {
            10
        }

        async fn evaluate(&self, _context: &PluginContext) -> PluginResult<PluginDecision> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(PluginDecision::allow("slow", "too late"))
        }
    }

    struct ErroringPlugin;

    #[async_trait]
    impl PolicyPlugin for ErroringPlugin {
        fn name(&self) -> &str {
            "erroring"
        }

        fn priority(&self) -> u32 {
            10
        }

        async fn evaluate(&self, _context: &PluginContext) -> PluginResult<PluginDecision> {
            Err(PluginError::evaluation("erroring", "backend returned garbage"))
        }
    }

    fn context() -> PluginContext {
        PluginContext::new("alice", "gateway:tool:invoke", "db")
    }

    #[tokio::test]
    async fn chain_runs_in_priority_order_with_name_tiebreak() {
        let manager = PluginManager::new();
        manager
            .register(StaticPlugin::new("b-second", 50, true), None)
            .await
            .unwrap();
        manager
            .register(StaticPlugin::new("a-tied", 50, true), None)
            .await
            .unwrap();
        manager
            .register(StaticPlugin::new("z-first", 10, true), None)
            .await
            .unwrap();

        let decisions = manager.evaluate_all(&context()).await;
        let order: Vec<&str> = decisions.iter().map(PluginDecision::plugin_name).collect();
        assert_eq!(order, vec!["z-first", "a-tied", "b-second"]);
        assert!(decisions.iter().all(PluginDecision::is_allowed));
    }

    #[tokio::test]
    async fn deny_mid_chain_keeps_earlier_verdicts_and_skips_later_plugins() {
        let manager = PluginManager::new();
        let first = StaticPlugin::new("first", 50, true);
        let second = StaticPlugin::new("second", 100, false);
        let third = StaticPlugin::new("third", 150, true);
        manager.register(Arc::clone(&first) as Arc<dyn PolicyPlugin>, None).await.unwrap();
        manager.register(Arc::clone(&second) as Arc<dyn PolicyPlugin>, None).await.unwrap();
        manager.register(Arc::clone(&third) as Arc<dyn PolicyPlugin>, None).await.unwrap();

        let decisions = manager.evaluate_all(&context()).await;
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].plugin_name(), "first");
        assert!(decisions[0].is_allowed());
        assert_eq!(decisions[1].plugin_name(), "second");
        assert!(!decisions[1].is_allowed());
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_deny_stops_the_chain() {
        let manager = PluginManager::new();
        let late = StaticPlugin::new("late", 90, true);
        manager
            .register(StaticPlugin::new("early-deny", 10, false), None)
            .await
            .unwrap();
        manager.register(Arc::clone(&late) as Arc<dyn PolicyPlugin>, None).await.unwrap();

        let decisions = manager.evaluate_all(&context()).await;
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].plugin_name(), "early-deny");
        assert!(!decisions[0].is_allowed());
        assert_eq!(late.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_registry_yields_no_decisions() {
        let manager = PluginManager::new();
        assert!(manager.evaluate_all(&context()).await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let manager = PluginManager::new();
        manager
            .register(StaticPlugin::new("quota", 10, true), None)
            .await
            .unwrap();

        let err = manager
            .register(StaticPlugin::new("quota", 20, true), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn failed_load_leaves_plugin_registered_but_disabled() {
        let manager = PluginManager::new();
        let err = manager.register(Arc::new(FailingLoad), None).await.unwrap_err();
        assert!(matches!(err, PluginError::Load { .. }));

        assert_eq!(manager.plugin_names().await, vec!["failing-load"]);
        assert!(!manager.is_enabled("failing-load").await);
        let listed = manager.list(false).await;
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].enabled);
        assert!(manager.list(true).await.is_empty());
        assert!(manager.evaluate_all(&context()).await.is_empty());

        // The operator can enable it once the backend is back.
        manager.enable("failing-load").await.unwrap();
        assert_eq!(manager.evaluate_all(&context()).await.len(), 1);
    }

    #[tokio::test]
    async fn disabled_plugins_are_skipped() {
        let manager = PluginManager::new();
        manager
            .register(StaticPlugin::new("quota", 10, false), None)
            .await
            .unwrap();
        manager.disable("quota").await;

        assert!(manager.evaluate_all(&context()).await.is_empty());
        // Disabling again or disabling an unknown name is a no-op.
        manager.disable("quota").await;
        manager.disable("ghost").await;
    }

    #[tokio::test]
    async fn timeout_denies_and_stops_the_chain() {
        let manager = PluginManager::with_timeout(Duration::from_millis(20));
        let late = StaticPlugin::new("late", 90, true);
        manager.register(Arc::new(SlowPlugin), None).await.unwrap();
        manager.register(Arc::clone(&late) as Arc<dyn PolicyPlugin>, None).await.unwrap();

        let decisions = manager.evaluate_all(&context()).await;
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].plugin_name(), "slow");
        assert!(!decisions[0].is_allowed());
        assert!(decisions[0].metadata().contains_key("timeout"));
        assert_eq!(late.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn evaluation_errors_deny_and_stop_the_chain() {
        let manager = PluginManager::new();
        let late = StaticPlugin::new("late", 90, true);
        manager.register(Arc::new(ErroringPlugin), None).await.unwrap();
        manager.register(Arc::clone(&late) as Arc<dyn PolicyPlugin>, None).await.unwrap();

        let decisions = manager.evaluate_all(&context()).await;
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].plugin_name(), "erroring");
        assert!(!decisions[0].is_allowed());
        let detail = decisions[0]
            .metadata()
            .get("error")
            .and_then(Value::as_str)
            .unwrap();
        assert!(detail.contains("backend returned garbage"));
        assert_eq!(late.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unregister_removes_and_unknown_names_error() {
        let manager = PluginManager::new();
        manager
            .register(StaticPlugin::new("quota", 10, true), None)
            .await
            .unwrap();

        manager.unregister("quota").await.unwrap();
        assert!(manager.plugin_names().await.is_empty());

        let err = manager.unregister("quota").await.unwrap_err();
        assert!(matches!(err, PluginError::NotRegistered { .. }));
        let err = manager.enable("quota").await.unwrap_err();
        assert!(matches!(err, PluginError::NotRegistered { .. }));
    }
}
