//! Plugin records, loading, and the hook executor.
//!
//! A [`Plugin`] is a name plus optional hooks. [`load_plugins`] turns raw
//! registry entries into plugins, and [`PluginPipeline`] runs their hooks in
//! registration order with per-plugin failure isolation.

mod loader;
mod pipeline;
mod plugin;

pub use loader::{PluginEntry, PluginFactory, PluginSource, load_plugins, validate_plugin_options};
pub use pipeline::PluginPipeline;
pub use plugin::{
    BoxFuture, HookError, HookResult, OptionsValidator, Plugin, ShortCircuitHook, SideEffectHook,
    TransformHook,
};
