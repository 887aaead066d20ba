//! Decision caching for the Warden policy engine.
//!
//! Caches authorization decisions keyed by principal, action, resource, and a
//! canonical hash of the request context. Entry lifetimes follow resource
//! sensitivity, stale entries can be served while a detached refresh runs,
//! and storage sits behind the [`DecisionStore`] trait so deployments can
//! swap the backend per caller through [`StoreFactory`].

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

mod cache;
mod error;
mod fingerprint;
mod select;
mod store;

pub use cache::{CacheConfig, CacheLookup, CacheMetrics, DecisionCache, Revalidate};
pub use error::{StoreError, StoreResult};
pub use fingerprint::{context_fingerprint, decision_key, principal_pattern, KEY_PREFIX};
pub use select::{SelectionPolicy, StoreConstructor, StoreFactory};
pub use store::{DecisionStore, MemoryStore};
