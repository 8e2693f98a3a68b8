//! Naming conventions consulted when inferring property roles.
//!
//! A convention says: "a column whose name is one of these (case-insensitive),
//! optionally with this storage type, plays this field's role". Tables are
//! plain data; [`crate::map_schema`] is the only code that interprets them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One semantic field and the column names that can fill it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConvention {
    /// Semantic field name (`slug`, `tags`, `order`, ...).
    pub field: String,
    /// Candidate column names, lower-case.
    pub names: Vec<String>,
    /// Storage type the column must have, if any.
    #[serde(default)]
    pub required_type: Option<String>,
}

impl FieldConvention {
    pub fn new(field: &str, names: &[&str], required_type: Option<&str>) -> Self {
        Self {
            field: field.to_string(),
            names: names.iter().map(|n| n.to_lowercase()).collect(),
            required_type: required_type.map(str::to_string),
        }
    }

    /// Whether a column with `name` (already lower-cased) and `kind` fits.
    pub fn matches(&self, name: &str, kind: &str) -> bool {
        self.names.iter().any(|n| n == name)
            && self.required_type.as_deref().is_none_or(|t| t == kind)
    }
}

/// Base conventions plus per-page-type metadata conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conventions {
    /// Fields every page type has (slug, published, description, cover, author).
    pub base: Vec<FieldConvention>,
    /// Page type → metadata field conventions.
    #[serde(default)]
    pub page_types: HashMap<String, Vec<FieldConvention>>,
}

impl Conventions {
    /// Metadata conventions for `page_type`; empty for unknown types.
    pub fn metadata_for(&self, page_type: &str) -> &[FieldConvention] {
        self.page_types
            .get(page_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for Conventions {
    fn default() -> Self {
        let base = vec![
            FieldConvention::new("slug", &["slug", "url", "path", "permalink"], None),
            FieldConvention::new(
                "published",
                &["published", "public", "publish", "is published"],
                Some("checkbox"),
            ),
            FieldConvention::new(
                "description",
                &["description", "summary", "excerpt", "subtitle"],
                None,
            ),
            FieldConvention::new("cover", &["cover", "cover image", "image", "thumbnail"], None),
            FieldConvention::new("author", &["author", "authors", "writer", "by"], None),
        ];

        let mut page_types = HashMap::new();
        page_types.insert(
            "blog".to_string(),
            vec![
                FieldConvention::new("tags", &["tags", "tag", "categories", "topics"], None),
                FieldConvention::new("series", &["series"], None),
            ],
        );
        page_types.insert(
            "project".to_string(),
            vec![
                FieldConvention::new(
                    "technologies",
                    &["technologies", "tech", "stack", "tech stack"],
                    None,
                ),
                FieldConvention::new("github", &["github", "repo", "repository", "source"], None),
                FieldConvention::new("demo", &["demo", "live", "website"], None),
                FieldConvention::new("featured", &["featured", "highlight"], Some("checkbox")),
                FieldConvention::new("order", &["order", "sort", "position"], None),
            ],
        );
        page_types.insert(
            "docs".to_string(),
            vec![
                FieldConvention::new("section", &["section", "category", "group", "chapter"], None),
                FieldConvention::new("order", &["order", "position", "sort", "weight"], None),
                FieldConvention::new("parent", &["parent", "parent page", "parent item"], None),
            ],
        );
        page_types.insert("page".to_string(), Vec::new());

        Self { base, page_types }
    }
}

// ---------------------------------------------------------------------------
// Metadata value semantics
// ---------------------------------------------------------------------------

/// How a metadata field's raw text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    /// Comma-separated list.
    List,
    /// Integer sort key; unparseable text becomes 0.
    Order,
    /// Truthy token (`yes`/`true`).
    Boolean,
    /// Trimmed string.
    Text,
}

impl MetadataKind {
    pub fn for_field(field: &str) -> Self {
        match field {
            "tags" | "technologies" => Self::List,
            "order" => Self::Order,
            "featured" | "draft" => Self::Boolean,
            _ => Self::Text,
        }
    }
}

/// The truthy-token rule shared by `published` and boolean metadata.
pub fn is_truthy(raw: &str) -> bool {
    let token = raw.trim();
    token.eq_ignore_ascii_case("yes") || token.eq_ignore_ascii_case("true")
}
