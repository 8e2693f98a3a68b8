//! Site configuration: raw input, resolution, and loading.
//!
//! Site config lives in `blockpress.toml` (or a `.json` file with the same
//! shape). CLI flags override config file values, which override defaults.
//!
//! Resolution is the one place errors are fatal: a config that fails
//! [`resolve_config`] must stop the build before anything is fetched.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{BlockpressError, Result};
use crate::types::SiteMetadata;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "blockpress.toml";

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_THEME: &str = "system";
const DEFAULT_PAGE_TYPE: &str = "page";
const DEFAULT_REVALIDATE_SECONDS: u64 = 60;

// ---------------------------------------------------------------------------
// Raw input (matching blockpress.toml)
// ---------------------------------------------------------------------------

/// Site config as written by the user; every field optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfigInput {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(alias = "defaultTheme")]
    pub default_theme: Option<String>,
    #[serde(alias = "defaultPageType")]
    pub default_page_type: Option<String>,
    #[serde(alias = "revalidateSeconds")]
    pub revalidate_seconds: Option<u64>,
    #[serde(alias = "revalidateSecret")]
    pub revalidate_secret: Option<String>,
    /// Single root collection; used when `collections` is absent.
    #[serde(alias = "rootSourceId")]
    pub root_source_id: Option<String>,
    pub collections: Option<Vec<CollectionInput>>,
}

/// `[[collections]]` entry as written by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionInput {
    #[serde(alias = "sourceId")]
    pub source_id: Option<String>,
    #[serde(alias = "pageType")]
    pub page_type: Option<String>,
    #[serde(alias = "pathPrefix")]
    pub path_prefix: Option<String>,
    /// Semantic field → property key, applied over inferred mappings.
    #[serde(alias = "schemaOverrides")]
    pub schema_overrides: Option<IndexMap<String, String>>,
}

// ---------------------------------------------------------------------------
// Resolved config
// ---------------------------------------------------------------------------

/// Validated site configuration with defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub domain: String,
    pub author: String,
    pub description: String,
    pub language: String,
    pub default_theme: String,
    pub default_page_type: String,
    pub revalidate_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revalidate_secret: Option<String>,
    pub collections: Vec<CollectionConfig>,
}

/// One content collection to ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub source_id: String,
    pub page_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schema_overrides: IndexMap<String, String>,
}

impl From<&SiteConfig> for SiteMetadata {
    fn from(config: &SiteConfig) -> Self {
        Self {
            title: config.name.clone(),
            description: config.description.clone(),
            domain: config.domain.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            default_theme: config.default_theme.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Validate `input` and fill in defaults.
///
/// Fails when `name` or `domain` is missing, when neither a root source id
/// nor any collections are given, or when a collection lacks its source id
/// or page type. With no collections, one default collection is synthesized
/// from the root source id.
pub fn resolve_config(input: SiteConfigInput) -> Result<SiteConfig> {
    let name = required(input.name, "name")?;
    let domain = required(input.domain, "domain")?;

    let default_page_type =
        non_blank(input.default_page_type).unwrap_or_else(|| DEFAULT_PAGE_TYPE.into());

    let declared = input.collections.unwrap_or_default();
    let collections = if declared.is_empty() {
        let root = non_blank(input.root_source_id).ok_or_else(|| {
            BlockpressError::config("either `root_source_id` or `collections` is required")
        })?;
        tracing::debug!(source_id = %root, "synthesizing default collection");
        vec![CollectionConfig {
            source_id: root,
            page_type: default_page_type.clone(),
            path_prefix: None,
            schema_overrides: IndexMap::new(),
        }]
    } else {
        declared
            .into_iter()
            .enumerate()
            .map(|(i, c)| resolve_collection(i, c))
            .collect::<Result<Vec<_>>>()?
    };

    Ok(SiteConfig {
        name,
        domain,
        author: input.author.unwrap_or_default(),
        description: input.description.unwrap_or_default(),
        language: non_blank(input.language).unwrap_or_else(|| DEFAULT_LANGUAGE.into()),
        default_theme: non_blank(input.default_theme).unwrap_or_else(|| DEFAULT_THEME.into()),
        default_page_type,
        revalidate_seconds: input
            .revalidate_seconds
            .unwrap_or(DEFAULT_REVALIDATE_SECONDS),
        revalidate_secret: non_blank(input.revalidate_secret),
        collections,
    })
}

fn resolve_collection(index: usize, input: CollectionInput) -> Result<CollectionConfig> {
    let source_id = non_blank(input.source_id).ok_or_else(|| {
        BlockpressError::config(format!("collections[{index}]: `source_id` is required"))
    })?;
    let page_type = non_blank(input.page_type).ok_or_else(|| {
        BlockpressError::config(format!("collections[{index}]: `page_type` is required"))
    })?;

    Ok(CollectionConfig {
        source_id,
        page_type,
        path_prefix: non_blank(input.path_prefix),
        schema_overrides: input.schema_overrides.unwrap_or_default(),
    })
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    non_blank(value).ok_or_else(|| BlockpressError::config(format!("site `{field}` is required")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse a config file without resolving it. `.json` files are read as JSON,
/// everything else as TOML.
pub fn read_config_input(path: &Path) -> Result<SiteConfigInput> {
    let content = std::fs::read_to_string(path).map_err(|e| BlockpressError::io(path, e))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| {
            BlockpressError::parse(format!("failed to parse {}: {e}", path.display()))
        })
    } else {
        toml::from_str(&content).map_err(|e| {
            BlockpressError::parse(format!("failed to parse {}: {e}", path.display()))
        })
    }
}

/// Load and resolve the site config at `path`.
pub fn load_site_config(path: &Path) -> Result<SiteConfig> {
    let input = read_config_input(path)?;
    let config = resolve_config(input)?;
    tracing::info!(
        path = %path.display(),
        collections = config.collections.len(),
        "site config resolved"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> SiteConfigInput {
        SiteConfigInput {
            name: Some("My Site".into()),
            domain: Some("example.com".into()),
            root_source_id: Some("root-123".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_applied() {
        let config = resolve_config(minimal()).expect("resolve");
        assert_eq!(config.language, "en");
        assert_eq!(config.default_theme, "system");
        assert_eq!(config.default_page_type, "page");
        assert_eq!(config.revalidate_seconds, 60);
        assert!(config.revalidate_secret.is_none());
    }

    #[test]
    fn root_source_synthesizes_default_collection() {
        let mut input = minimal();
        input.default_page_type = Some("blog".into());
        let config = resolve_config(input).expect("resolve");

        assert_eq!(config.collections.len(), 1);
        assert_eq!(config.collections[0].source_id, "root-123");
        assert_eq!(config.collections[0].page_type, "blog");
    }

    #[test]
    fn missing_name_is_fatal() {
        let mut input = minimal();
        input.name = None;
        let err = resolve_config(input).unwrap_err();
        assert!(err.to_string().contains("`name`"));
    }

    #[test]
    fn blank_domain_is_fatal() {
        let mut input = minimal();
        input.domain = Some("   ".into());
        let err = resolve_config(input).unwrap_err();
        assert!(err.to_string().contains("`domain`"));
    }

    #[test]
    fn no_source_is_fatal() {
        let mut input = minimal();
        input.root_source_id = None;
        let err = resolve_config(input).unwrap_err();
        assert!(matches!(err, BlockpressError::Config { .. }));
    }

    #[test]
    fn collection_without_page_type_is_fatal() {
        let mut input = minimal();
        input.collections = Some(vec![CollectionInput {
            source_id: Some("blog-db".into()),
            ..Default::default()
        }]);
        let err = resolve_config(input).unwrap_err();
        assert!(err.to_string().contains("collections[0]"));
        assert!(err.to_string().contains("page_type"));
    }

    #[test]
    fn declared_collections_win_over_root() {
        let toml_str = r#"
name = "Notes"
domain = "notes.example.com"
rootSourceId = "ignored"

[[collections]]
source_id = "posts"
page_type = "blog"
path_prefix = "/blog"

[collections.schema_overrides]
date = "pub-date"
tags = "labels"

[[collections]]
sourceId = "handbook"
pageType = "docs"
"#;
        let input: SiteConfigInput = toml::from_str(toml_str).expect("parse");
        let config = resolve_config(input).expect("resolve");

        assert_eq!(config.collections.len(), 2);
        assert_eq!(config.collections[0].path_prefix.as_deref(), Some("/blog"));
        assert_eq!(config.collections[0].schema_overrides["tags"], "labels");
        assert_eq!(config.collections[1].page_type, "docs");
    }

    #[test]
    fn load_from_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("site.json");
        std::fs::write(
            &path,
            r#"{"name": "Site", "domain": "site.dev", "rootSourceId": "abc", "revalidateSeconds": 10}"#,
        )
        .expect("write");

        let config = load_site_config(&path).expect("load");
        assert_eq!(config.revalidate_seconds, 10);
        assert_eq!(config.collections[0].source_id, "abc");
    }

    #[test]
    fn metadata_from_config() {
        let config = resolve_config(minimal()).expect("resolve");
        let meta = SiteMetadata::from(&config);
        assert_eq!(meta.title, "My Site");
        assert_eq!(meta.domain, "example.com");
    }
}
