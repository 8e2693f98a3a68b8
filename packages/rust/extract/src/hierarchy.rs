//! Parent/child linking for hierarchical page types.

use std::collections::HashMap;

use blockpress_shared::{MetadataValue, Page};

/// Page types whose pages form a tree.
pub const HIERARCHICAL_PAGE_TYPES: &[&str] = &["docs"];

pub fn is_hierarchical(page_type: &str) -> bool {
    HIERARCHICAL_PAGE_TYPES.contains(&page_type)
}

/// Resolve `parent` references and fill `children` for hierarchical pages.
///
/// A `parent` metadata value may name a sibling by id, slug or title
/// (case-insensitive); otherwise any pre-set `parent` id is kept if that page
/// is present. Children are ordered by `order`, then title.
pub fn link_hierarchy(pages: &mut [Page]) {
    let mut lookup: HashMap<String, usize> = HashMap::new();
    for (i, page) in pages.iter().enumerate() {
        if !is_hierarchical(&page.page_type) {
            continue;
        }
        lookup.entry(page.id.clone()).or_insert(i);
        lookup.entry(page.slug.to_lowercase()).or_insert(i);
        lookup.entry(page.title.trim().to_lowercase()).or_insert(i);
    }

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..pages.len() {
        if !is_hierarchical(&pages[i].page_type) {
            continue;
        }

        let reference = pages[i]
            .metadata
            .get("parent")
            .and_then(MetadataValue::as_text)
            .map(|r| r.trim().to_lowercase())
            .or_else(|| pages[i].parent.clone());

        let parent = reference
            .and_then(|r| lookup.get(&r).copied())
            .filter(|&p| p != i);

        pages[i].parent = parent.map(|p| pages[p].id.clone());
        if let Some(p) = parent {
            children.entry(p).or_default().push(i);
        }
    }

    for (parent, mut kids) in children {
        kids.sort_by(|&a, &b| {
            let (a, b) = (&pages[a], &pages[b]);
            (a.order.is_none(), a.order, &a.title).cmp(&(b.order.is_none(), b.order, &b.title))
        });
        pages[parent].children = kids.iter().map(|&k| pages[k].id.clone()).collect();
    }
}
