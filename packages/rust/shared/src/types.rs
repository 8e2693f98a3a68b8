//! Normalized domain types produced by the ingestion pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PropertyMapping
// ---------------------------------------------------------------------------

/// Semantic roles resolved from a collection schema.
///
/// Each key is a property id in the collection schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMapping {
    pub title_key: Option<String>,
    pub slug_key: Option<String>,
    pub published_key: Option<String>,
    pub description_key: Option<String>,
    pub cover_key: Option<String>,
    pub author_key: Option<String>,
    pub date_key: Option<String>,
    pub type_key: Option<String>,
    /// Page-type-specific field → property key (tags, section, order, ...).
    #[serde(default)]
    pub metadata_keys: IndexMap<String, String>,
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// A value stored in [`Page::metadata`]. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(i64),
    List(Vec<String>),
    Text(String),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// A typed, validated page ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Source block id.
    pub id: String,
    pub title: String,
    /// URL slug; the block id when the source has none.
    pub slug: String,
    pub page_type: String,
    pub published: bool,
    /// Raw date string; empty when the source has none.
    #[serde(default)]
    pub date: String,
    /// Epoch milliseconds.
    pub last_edited_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, MetadataValue>,
    /// The raw inline frontmatter, kept for introspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

// ---------------------------------------------------------------------------
// Build-level values handed to plugins
// ---------------------------------------------------------------------------

/// Site-wide head metadata, adjustable by plugins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    pub title: String,
    pub description: String,
    pub domain: String,
    pub author: String,
    pub language: String,
    pub default_theme: String,
}

/// Counters reported once a build completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    pub collections: usize,
    pub pages: usize,
    pub routes: usize,
    pub elapsed_ms: u128,
}
