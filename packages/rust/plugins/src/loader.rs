//! Turning registry entries into loaded plugins.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, info, warn};

use blockpress_shared::{BlockpressError, Result};

use crate::plugin::Plugin;

/// Builds a plugin, receiving registration options when there are any.
pub type PluginFactory = Arc<dyn Fn(Option<serde_json::Value>) -> Plugin + Send + Sync>;

/// Something that yields a plugin.
#[derive(Clone)]
pub enum PluginSource {
    Instance(Plugin),
    Factory(PluginFactory),
}

/// One entry of a plugin registry.
#[derive(Clone)]
pub enum PluginEntry {
    /// A ready plugin.
    Instance(Plugin),
    /// A factory called without options.
    Factory(PluginFactory),
    /// A plugin or factory paired with options.
    Configured(PluginSource, serde_json::Value),
    /// A switched-off entry. Dropped at load time.
    Disabled,
}

impl From<Plugin> for PluginEntry {
    fn from(plugin: Plugin) -> Self {
        PluginEntry::Instance(plugin)
    }
}

/// Load plugins in registry order.
///
/// Disabled entries are dropped. Duplicate names are reported but both
/// copies load. A plugin whose options fail `validate_options` is reported
/// and still loads. A factory that panics is reported and skipped, since
/// there is no plugin to load.
pub fn load_plugins(entries: Vec<PluginEntry>) -> Vec<Plugin> {
    let mut plugins = Vec::with_capacity(entries.len());
    let mut seen: HashSet<String> = HashSet::new();

    for (index, entry) in entries.into_iter().enumerate() {
        let (source, options) = match entry {
            PluginEntry::Disabled => {
                debug!(index, "plugin entry disabled");
                continue;
            }
            PluginEntry::Instance(plugin) => (PluginSource::Instance(plugin), None),
            PluginEntry::Factory(factory) => (PluginSource::Factory(factory), None),
            PluginEntry::Configured(source, options) => (source, Some(options)),
        };

        let Some(plugin) = instantiate(index, source, options) else {
            continue;
        };

        if !seen.insert(plugin.name.clone()) {
            warn!(plugin = %plugin.name, "duplicate plugin name; both will run");
        }

        if let Err(e) = validate_plugin_options(&plugin) {
            warn!(plugin = %plugin.name, error = %e, "plugin options rejected; loading anyway");
        }

        debug!(plugin = %plugin.name, hooks = ?plugin.hook_names(), "plugin loaded");
        plugins.push(plugin);
    }

    info!(count = plugins.len(), "plugins loaded");
    plugins
}

/// Run a plugin's options validator against its options.
///
/// A plugin without a validator or without options always passes.
pub fn validate_plugin_options(plugin: &Plugin) -> Result<()> {
    let (Some(validate), Some(options)) = (&plugin.validate_options, &plugin.options) else {
        return Ok(());
    };
    validate(options).map_err(|e| {
        BlockpressError::validation(format!("plugin `{}` options: {e}", plugin.name))
    })
}

fn instantiate(
    index: usize,
    source: PluginSource,
    options: Option<serde_json::Value>,
) -> Option<Plugin> {
    match source {
        PluginSource::Instance(mut plugin) => {
            if options.is_some() {
                plugin.options = options;
            }
            Some(plugin)
        }
        PluginSource::Factory(factory) => {
            let built = catch_unwind(AssertUnwindSafe(|| factory(options.clone())));
            match built {
                Ok(mut plugin) => {
                    if plugin.options.is_none() {
                        plugin.options = options;
                    }
                    Some(plugin)
                }
                Err(_) => {
                    warn!(index, "plugin factory panicked; entry skipped");
                    None
                }
            }
        }
    }
}
