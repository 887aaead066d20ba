//! Fail-closed policy decision engine facade.
//!
//! Depend on this crate via `cargo add warden`. It bundles the internal
//! engine crates behind feature flags so deployments can pull in only the
//! components they need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared contracts for convenience.
pub use warden_primitives as primitives;

/// Remote policy oracle client (enabled by `oracle` feature).
#[cfg(feature = "oracle")]
pub use warden_oracle as oracle;

/// Decision caching (enabled by `cache` feature).
#[cfg(feature = "cache")]
pub use warden_cache as cache;

/// Local policy plugin chain (enabled by `plugins` feature).
#[cfg(feature = "plugins")]
pub use warden_plugins as plugins;

/// Authorization orchestration (enabled by `engine` feature).
#[cfg(feature = "engine")]
pub use warden_engine as engine;
