//! Convention-based schema inference.
//!
//! Given a collection's column declarations, [`map_schema`] decides which
//! column plays which semantic role (title, slug, date, tags, ...) and returns
//! a [`PropertyMapping`] the extractor can consume.
//!
//! Matching is a single pass over the schema in declaration order. Within that
//! pass a field is assigned at most once: the first column that fits wins.
//! Manual overrides are applied afterwards and always replace inferred keys.

mod conventions;

use indexmap::IndexMap;
use tracing::debug;

use blockpress_shared::{PropertyMapping, PropertySchema};

pub use conventions::{Conventions, FieldConvention, MetadataKind, is_truthy};

/// Infer a [`PropertyMapping`] for `page_type` from `schema`.
///
/// `conventions` defaults to [`Conventions::default`]. Unknown page types use
/// the base conventions only. Override keys may be written either as the bare
/// field (`date`) or with a `Key` suffix (`dateKey`); any field that is not a
/// base role lands in `metadata_keys`.
pub fn map_schema(
    schema: &IndexMap<String, PropertySchema>,
    page_type: &str,
    overrides: Option<&IndexMap<String, String>>,
    conventions: Option<&Conventions>,
) -> PropertyMapping {
    let builtin;
    let conventions = match conventions {
        Some(c) => c,
        None => {
            builtin = Conventions::default();
            &builtin
        }
    };
    let metadata_conventions = conventions.metadata_for(page_type);

    let mut mapping = PropertyMapping::default();

    for (key, prop) in schema {
        let name = prop.name.trim().to_lowercase();
        let kind = prop.kind.as_str();

        if kind == "title" {
            set_once(&mut mapping.title_key, key);
        }
        if kind == "select" && name == "type" {
            set_once(&mut mapping.type_key, key);
        }
        if matches!(kind, "date" | "last_edited_time") && matches!(name.as_str(), "date" | "published")
        {
            set_once(&mut mapping.date_key, key);
        }

        for conv in &conventions.base {
            if conv.matches(&name, kind) {
                match base_slot(&mut mapping, &conv.field) {
                    Some(slot) => set_once(slot, key),
                    None => set_metadata_once(&mut mapping, &conv.field, key),
                }
            }
        }

        for conv in metadata_conventions {
            if conv.matches(&name, kind) {
                set_metadata_once(&mut mapping, &conv.field, key);
            }
        }
    }

    if let Some(overrides) = overrides {
        apply_overrides(&mut mapping, overrides);
    }

    debug!(page_type, ?mapping, "schema mapped");
    mapping
}

fn apply_overrides(mapping: &mut PropertyMapping, overrides: &IndexMap<String, String>) {
    for (field, key) in overrides {
        let field = field.strip_suffix("Key").unwrap_or(field);
        match base_slot(mapping, field) {
            Some(slot) => *slot = Some(key.clone()),
            None => {
                mapping.metadata_keys.insert(field.to_string(), key.clone());
            }
        }
    }
}

/// The typed slot for a base role, or `None` for metadata fields.
fn base_slot<'a>(mapping: &'a mut PropertyMapping, field: &str) -> Option<&'a mut Option<String>> {
    match field {
        "title" => Some(&mut mapping.title_key),
        "slug" => Some(&mut mapping.slug_key),
        "published" => Some(&mut mapping.published_key),
        "description" => Some(&mut mapping.description_key),
        "cover" => Some(&mut mapping.cover_key),
        "author" => Some(&mut mapping.author_key),
        "date" => Some(&mut mapping.date_key),
        "type" => Some(&mut mapping.type_key),
        _ => None,
    }
}

fn set_once(slot: &mut Option<String>, key: &str) {
    if slot.is_none() {
        *slot = Some(key.to_string());
    }
}

fn set_metadata_once(mapping: &mut PropertyMapping, field: &str, key: &str) {
    if !mapping.metadata_keys.contains_key(field) {
        mapping
            .metadata_keys
            .insert(field.to_string(), key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(entries: &[(&str, &str, &str)]) -> IndexMap<String, PropertySchema> {
        entries
            .iter()
            .map(|(key, name, kind)| {
                (
                    key.to_string(),
                    PropertySchema {
                        name: name.to_string(),
                        kind: kind.to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn title_property_becomes_title_key() {
        let s = schema(&[("a1", "Description", "text"), ("title", "Name", "title")]);
        let mapping = map_schema(&s, "page", None, None);
        assert_eq!(mapping.title_key.as_deref(), Some("title"));
        assert_eq!(mapping.description_key.as_deref(), Some("a1"));
    }

    #[test]
    fn blog_schema_maps_base_and_metadata_fields() {
        let s = schema(&[
            ("title", "Title", "title"),
            ("k1", "Slug", "text"),
            ("k2", "Published", "checkbox"),
            ("k3", "Date", "date"),
            ("k4", "Tags", "multi_select"),
            ("k5", "Type", "select"),
            ("k6", "Cover", "file"),
            ("k7", "Author", "person"),
        ]);
        let mapping = map_schema(&s, "blog", None, None);

        assert_eq!(mapping.slug_key.as_deref(), Some("k1"));
        assert_eq!(mapping.published_key.as_deref(), Some("k2"));
        assert_eq!(mapping.date_key.as_deref(), Some("k3"));
        assert_eq!(mapping.type_key.as_deref(), Some("k5"));
        assert_eq!(mapping.cover_key.as_deref(), Some("k6"));
        assert_eq!(mapping.author_key.as_deref(), Some("k7"));
        assert_eq!(mapping.metadata_keys["tags"], "k4");
    }

    #[test]
    fn first_convention_match_wins() {
        let s = schema(&[("k1", "Summary", "text"), ("k2", "Description", "text")]);
        let mapping = map_schema(&s, "page", None, None);
        assert_eq!(mapping.description_key.as_deref(), Some("k1"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let s = schema(&[("k1", "SLUG", "text"), ("k2", "  published ", "checkbox")]);
        let mapping = map_schema(&s, "page", None, None);
        assert_eq!(mapping.slug_key.as_deref(), Some("k1"));
        assert_eq!(mapping.published_key.as_deref(), Some("k2"));
    }

    #[test]
    fn published_date_column_is_a_date_not_a_flag() {
        let s = schema(&[("k1", "Published", "date"), ("k2", "Date", "date")]);
        let mapping = map_schema(&s, "blog", None, None);
        assert_eq!(mapping.date_key.as_deref(), Some("k1"));
        assert!(mapping.published_key.is_none());
    }

    #[test]
    fn last_edited_time_can_serve_as_date() {
        let s = schema(&[("k1", "Date", "last_edited_time")]);
        let mapping = map_schema(&s, "blog", None, None);
        assert_eq!(mapping.date_key.as_deref(), Some("k1"));
    }

    #[test]
    fn type_requires_select() {
        let s = schema(&[("k1", "Type", "text"), ("k2", "type", "select")]);
        let mapping = map_schema(&s, "page", None, None);
        assert_eq!(mapping.type_key.as_deref(), Some("k2"));
    }

    #[test]
    fn unknown_page_type_gets_base_fields_only() {
        let s = schema(&[("k1", "Slug", "text"), ("k2", "Tags", "multi_select")]);
        let mapping = map_schema(&s, "recipe", None, None);
        assert_eq!(mapping.slug_key.as_deref(), Some("k1"));
        assert!(mapping.metadata_keys.is_empty());
    }

    #[test]
    fn overrides_replace_inferred_keys() {
        let s = schema(&[
            ("title", "Title", "title"),
            ("k1", "Date", "date"),
            ("k2", "Tags", "multi_select"),
        ]);
        let overrides: IndexMap<String, String> = [
            ("date".to_string(), "custom-date".to_string()),
            ("titleKey".to_string(), "custom-title".to_string()),
            ("tags".to_string(), "labels".to_string()),
            ("mood".to_string(), "k9".to_string()),
        ]
        .into_iter()
        .collect();

        let mapping = map_schema(&s, "blog", Some(&overrides), None);
        assert_eq!(mapping.date_key.as_deref(), Some("custom-date"));
        assert_eq!(mapping.title_key.as_deref(), Some("custom-title"));
        assert_eq!(mapping.metadata_keys["tags"], "labels");
        assert_eq!(mapping.metadata_keys["mood"], "k9");
    }

    #[test]
    fn custom_conventions_are_honored() {
        let mut conventions = Conventions::default();
        conventions.page_types.insert(
            "recipe".into(),
            vec![FieldConvention::new("servings", &["Serves"], Some("number"))],
        );
        let s = schema(&[("k1", "serves", "number")]);
        let mapping = map_schema(&s, "recipe", None, Some(&conventions));
        assert_eq!(mapping.metadata_keys["servings"], "k1");
    }
}
