//! The plugin record and its hook shapes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use blockpress_shared::{BuildSummary, Page, SiteConfig, SiteMetadata};

/// Error returned by a hook. Any error type works.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub type HookResult<T> = std::result::Result<T, HookError>;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Observes a value; the result only matters for logging.
pub type SideEffectHook<T> = Arc<dyn Fn(T) -> BoxFuture<HookResult<()>> + Send + Sync>;

/// Receives the running value and returns its replacement.
pub type TransformHook<T> = Arc<dyn Fn(T) -> BoxFuture<HookResult<T>> + Send + Sync>;

/// Like [`TransformHook`], but `None` halts the chain.
pub type ShortCircuitHook<T> = Arc<dyn Fn(T) -> BoxFuture<HookResult<Option<T>>> + Send + Sync>;

/// Checks a plugin's options at load time.
pub type OptionsValidator = Arc<dyn Fn(&serde_json::Value) -> HookResult<()> + Send + Sync>;

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// A named bundle of optional hooks.
///
/// Every hook is optional; the executor skips plugins that leave one unset.
#[derive(Clone, Default)]
pub struct Plugin {
    pub name: String,
    /// Options supplied at registration, if any.
    pub options: Option<serde_json::Value>,
    pub validate_options: Option<OptionsValidator>,

    pub on_config_resolved: Option<SideEffectHook<SiteConfig>>,
    pub on_build_complete: Option<SideEffectHook<BuildSummary>>,
    pub transform_pages: Option<TransformHook<Vec<Page>>>,
    pub transform_metadata: Option<TransformHook<SiteMetadata>>,
    /// Maps a route path to a new one, or `None` to drop the route.
    pub resolve_route: Option<ShortCircuitHook<String>>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_validator<F>(mut self, validate: F) -> Self
    where
        F: Fn(&serde_json::Value) -> HookResult<()> + Send + Sync + 'static,
    {
        self.validate_options = Some(Arc::new(validate));
        self
    }

    pub fn with_config_resolved<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(SiteConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<()>> + Send + 'static,
    {
        self.on_config_resolved = Some(Arc::new(move |config| Box::pin(hook(config))));
        self
    }

    pub fn with_build_complete<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(BuildSummary) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<()>> + Send + 'static,
    {
        self.on_build_complete = Some(Arc::new(move |summary| Box::pin(hook(summary))));
        self
    }

    pub fn with_transform_pages<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<Page>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Vec<Page>>> + Send + 'static,
    {
        self.transform_pages = Some(Arc::new(move |pages| Box::pin(hook(pages))));
        self
    }

    pub fn with_transform_metadata<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(SiteMetadata) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<SiteMetadata>> + Send + 'static,
    {
        self.transform_metadata = Some(Arc::new(move |metadata| Box::pin(hook(metadata))));
        self
    }

    pub fn with_resolve_route<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<String>>> + Send + 'static,
    {
        self.resolve_route = Some(Arc::new(move |route| Box::pin(hook(route))));
        self
    }

    /// Names of the hooks this plugin implements, for logging.
    pub fn hook_names(&self) -> Vec<&'static str> {
        [
            ("on_config_resolved", self.on_config_resolved.is_some()),
            ("on_build_complete", self.on_build_complete.is_some()),
            ("transform_pages", self.transform_pages.is_some()),
            ("transform_metadata", self.transform_metadata.is_some()),
            ("resolve_route", self.resolve_route.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("hooks", &self.hook_names())
            .finish()
    }
}
