//! Policy plugins for the Warden engine.
//!
//! Plugins are local checks that run before the remote policy oracle is
//! consulted. They are registered with a [`PluginManager`], evaluated
//! sequentially in priority order, and the first deny short-circuits the
//! chain. Plugin failures and timeouts deny rather than allow.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

mod error;
mod manager;
mod plugin;

pub use error::{PluginError, PluginResult};
pub use manager::{PluginDescriptor, PluginManager};
pub use plugin::{PluginContext, PluginDecision, PolicyPlugin};
