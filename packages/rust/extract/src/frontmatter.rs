//! Inline frontmatter: a `key: value` code block as a page's first child.
//!
//! ```text
//! # overrides for this page
//! slug: /hello-world
//! tags: rust, notes
//! canonical: "https://example.com/a:b"
//! ```

use indexmap::IndexMap;

use blockpress_shared::{Block, BlockGraph, CODE_BLOCK, MetadataValue, Page};

/// Property key holding a code block's source text.
const CODE_TEXT_PROPERTY: &str = "title";

/// Read the frontmatter block of `page`, if it has one.
///
/// Only the first child is considered, and only when it is a code block with
/// non-blank text.
pub fn parse_frontmatter(graph: &BlockGraph, page: &Block) -> Option<IndexMap<String, String>> {
    let first = graph.first_child(page)?;
    if first.kind != CODE_BLOCK {
        return None;
    }

    let text = first.property(CODE_TEXT_PROPERTY)?.plain_text();
    if text.trim().is_empty() {
        return None;
    }

    Some(parse_frontmatter_text(&text))
}

/// Parse newline-delimited `key: value` pairs.
///
/// Blank lines, `#` comments and lines without a colon are skipped. The first
/// colon splits key from value, and one pair of matching surrounding quotes is
/// removed from the value.
pub fn parse_frontmatter_text(text: &str) -> IndexMap<String, String> {
    let mut pairs = IndexMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        pairs.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }

    pairs
}

fn strip_quotes(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Return a copy of `page` with `frontmatter` applied. `page` is untouched.
///
/// `title` and `description` overwrite directly. `slug` beats `cleanUrl`
/// and `coverImage` beats `cover`. `tags` becomes a list. Every other key is
/// merged into metadata as a string, and the whole map is kept on
/// [`Page::frontmatter`].
pub fn apply_frontmatter(page: &Page, frontmatter: &IndexMap<String, String>) -> Page {
    let mut next = page.clone();

    for (key, value) in frontmatter {
        match key.as_str() {
            "title" => next.title = value.clone(),
            "description" => next.description = Some(value.clone()),
            "slug" | "cleanUrl" | "coverImage" | "cover" => {}
            "tags" => {
                let tags = split_list(value);
                if !tags.is_empty() {
                    next.metadata.insert("tags".into(), MetadataValue::List(tags));
                }
            }
            _ => {
                if !value.is_empty() {
                    next.metadata
                        .insert(key.clone(), MetadataValue::Text(value.clone()));
                }
            }
        }
    }

    for key in ["cleanUrl", "slug"] {
        if let Some(slug) = frontmatter.get(key) {
            let slug = slug.strip_prefix('/').unwrap_or(slug);
            if !slug.is_empty() {
                next.slug = slug.to_string();
            }
        }
    }

    if let Some(cover) = frontmatter
        .get("coverImage")
        .or_else(|| frontmatter.get("cover"))
    {
        next.cover_image = Some(cover.clone());
    }

    next.frontmatter = Some(frontmatter.clone());
    next
}

/// Split a comma-separated value into trimmed, non-empty items.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
