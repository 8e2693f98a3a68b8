//! Sequential hook execution with per-plugin isolation.
//!
//! Every invocation runs inside its own task so that an error or a panic in
//! plugin code stops at this boundary. Invocations are awaited one at a time
//! in registration order; later plugins see earlier plugins' effects.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use blockpress_shared::{BuildSummary, Page, SiteConfig, SiteMetadata};

use crate::loader::{PluginEntry, load_plugins};
use crate::plugin::{BoxFuture, HookResult, Plugin};

/// An immutable, ordered set of loaded plugins.
#[derive(Clone, Default)]
pub struct PluginPipeline {
    plugins: Arc<[Plugin]>,
}

impl std::fmt::Debug for PluginPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginPipeline")
            .field("plugins", &self.names())
            .finish()
    }
}

impl PluginPipeline {
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self {
            plugins: plugins.into(),
        }
    }

    /// Load `entries` with [`load_plugins`] and wrap the result.
    pub fn from_entries(entries: Vec<PluginEntry>) -> Self {
        Self::new(load_plugins(entries))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }

    // -----------------------------------------------------------------------
    // Side-effect hooks
    // -----------------------------------------------------------------------

    #[instrument(skip_all, fields(plugins = self.plugins.len()))]
    pub async fn config_resolved(&self, config: &SiteConfig) {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.on_config_resolved {
                let hook = Arc::clone(hook);
                let config = config.clone();
                invoke(&plugin.name, "on_config_resolved", move || hook(config)).await;
            }
        }
    }

    #[instrument(skip_all, fields(plugins = self.plugins.len()))]
    pub async fn build_complete(&self, summary: &BuildSummary) {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.on_build_complete {
                let hook = Arc::clone(hook);
                let summary = summary.clone();
                invoke(&plugin.name, "on_build_complete", move || hook(summary)).await;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transform hooks
    // -----------------------------------------------------------------------

    /// Thread `pages` through every `transform_pages` hook.
    ///
    /// A failing plugin's attempt is discarded and the value it received is
    /// passed on unchanged.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub async fn transform_pages(&self, mut pages: Vec<Page>) -> Vec<Page> {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.transform_pages {
                let hook = Arc::clone(hook);
                let input = pages.clone();
                if let Some(output) =
                    invoke(&plugin.name, "transform_pages", move || hook(input)).await
                {
                    debug!(
                        plugin = %plugin.name,
                        before = pages.len(),
                        after = output.len(),
                        "pages transformed"
                    );
                    pages = output;
                }
            }
        }
        pages
    }

    #[instrument(skip_all)]
    pub async fn transform_metadata(&self, mut metadata: SiteMetadata) -> SiteMetadata {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.transform_metadata {
                let hook = Arc::clone(hook);
                let input = metadata.clone();
                if let Some(output) =
                    invoke(&plugin.name, "transform_metadata", move || hook(input)).await
                {
                    metadata = output;
                }
            }
        }
        metadata
    }

    // -----------------------------------------------------------------------
    // Short-circuit hooks
    // -----------------------------------------------------------------------

    /// Resolve `route` through every `resolve_route` hook.
    ///
    /// The first `None` ends the chain and is the result; later plugins are
    /// not called. A failing plugin leaves the route as it was.
    #[instrument(skip_all, fields(route = %route))]
    pub async fn resolve_route(&self, route: String) -> Option<String> {
        let mut current = route;
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.resolve_route {
                let hook = Arc::clone(hook);
                let input = current.clone();
                match invoke(&plugin.name, "resolve_route", move || hook(input)).await {
                    Some(Some(next)) => current = next,
                    Some(None) => {
                        debug!(plugin = %plugin.name, "route dropped");
                        return None;
                    }
                    None => {}
                }
            }
        }
        Some(current)
    }
}

/// Run one hook invocation in its own task.
///
/// Returns `None` when the hook errors or panics, after logging the plugin
/// and hook name.
async fn invoke<T, F>(plugin: &str, hook: &'static str, call: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> BoxFuture<HookResult<T>> + Send + 'static,
{
    let handle = tokio::spawn(async move { call().await });
    match handle.await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(plugin, hook, error = %e, "plugin hook failed");
            None
        }
        Err(e) => {
            warn!(plugin, hook, error = %e, "plugin hook panicked");
            None
        }
    }
}
