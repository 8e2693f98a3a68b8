//! End-to-end site build: config → collections → pages → routes.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument};

use blockpress_extract::extract_pages_with_defaults;
use blockpress_plugins::PluginPipeline;
use blockpress_schema::map_schema;
use blockpress_shared::{BuildSummary, CollectionConfig, Page, Result, SiteConfig, SiteMetadata};

use crate::source::ContentSource;

/// A page's public path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub path: String,
    pub page_id: String,
}

/// Everything a renderer needs from one build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteBuild {
    pub metadata: SiteMetadata,
    pub pages: Vec<Page>,
    pub routes: Vec<Route>,
    pub summary: BuildSummary,
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each collection is extracted.
    fn collection_done(&self, source_id: &str, pages: usize, current: usize, total: usize);
    /// Called when the build completes.
    fn done(&self, summary: &BuildSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn collection_done(&self, _source_id: &str, _pages: usize, _current: usize, _total: usize) {}
    fn done(&self, _summary: &BuildSummary) {}
}

/// Run a full build.
///
/// 1. `on_config_resolved` hooks
/// 2. Per collection: fetch graph, infer mapping, extract pages
/// 3. `transform_pages` hooks over all pages
/// 4. Route table through `resolve_route` hooks
/// 5. `transform_metadata` hooks
/// 6. `on_build_complete` hooks
///
/// A fetch error aborts the build and is returned as is. Nothing else
/// downstream of the config fails the build.
#[instrument(skip_all, fields(site = %config.name, collections = config.collections.len()))]
pub async fn build_site<S: ContentSource>(
    config: &SiteConfig,
    source: &S,
    plugins: &PluginPipeline,
    progress: &dyn ProgressReporter,
) -> Result<SiteBuild> {
    let start = Instant::now();
    info!(plugins = plugins.len(), "starting build");

    plugins.config_resolved(config).await;

    // --- Collections ---
    progress.phase("Extracting collections");
    let total = config.collections.len();
    let mut pages: Vec<Page> = Vec::new();
    let mut prefixes: HashMap<String, Option<String>> = HashMap::new();

    for (i, collection) in config.collections.iter().enumerate() {
        let graph = source.fetch_graph(&collection.source_id).await?;

        let overrides = (!collection.schema_overrides.is_empty())
            .then_some(&collection.schema_overrides);
        let mapping = map_schema(&graph.schema, &collection.page_type, overrides, None);
        debug!(source_id = %collection.source_id, ?mapping, "schema mapped");

        let extracted = extract_pages_with_defaults(&graph, &mapping, &collection.page_type);
        for page in &extracted {
            prefixes.insert(page.id.clone(), collection.path_prefix.clone());
        }
        progress.collection_done(&collection.source_id, extracted.len(), i + 1, total);
        pages.extend(extracted);
    }

    // --- Plugins ---
    progress.phase("Running plugins");
    let pages = plugins.transform_pages(pages).await;

    progress.phase("Resolving routes");
    let mut routes = Vec::with_capacity(pages.len());
    for page in &pages {
        let prefix = prefixes
            .get(&page.id)
            .cloned()
            .unwrap_or_else(|| prefix_for_type(&config.collections, &page.page_type));
        let candidate = route_path(prefix.as_deref(), &page.slug);
        match plugins.resolve_route(candidate).await {
            Some(path) => routes.push(Route {
                path,
                page_id: page.id.clone(),
            }),
            None => debug!(page = %page.id, "page left without a route"),
        }
    }

    let metadata = plugins.transform_metadata(SiteMetadata::from(config)).await;

    let summary = BuildSummary {
        collections: total,
        pages: pages.len(),
        routes: routes.len(),
        elapsed_ms: start.elapsed().as_millis(),
    };
    plugins.build_complete(&summary).await;

    info!(
        pages = summary.pages,
        routes = summary.routes,
        elapsed_ms = summary.elapsed_ms,
        "build complete"
    );
    progress.done(&summary);

    Ok(SiteBuild {
        metadata,
        pages,
        routes,
        summary,
    })
}

/// Prefix for pages a plugin added, taken from the first collection of the
/// same page type.
fn prefix_for_type(collections: &[CollectionConfig], page_type: &str) -> Option<String> {
    collections
        .iter()
        .find(|c| c.page_type == page_type)
        .and_then(|c| c.path_prefix.clone())
}

/// `/{prefix}/{slug}` with duplicate slashes removed.
fn route_path(prefix: Option<&str>, slug: &str) -> String {
    let prefix = prefix.map(|p| p.trim_matches('/')).unwrap_or_default();
    let slug = slug.trim_matches('/');
    match (prefix.is_empty(), slug.is_empty()) {
        (true, _) => format!("/{slug}"),
        (false, true) => format!("/{prefix}"),
        (false, false) => format!("/{prefix}/{slug}"),
    }
}
