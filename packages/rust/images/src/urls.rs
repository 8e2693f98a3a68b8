//! Collecting, naming and rewriting asset URLs.

use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

use blockpress_shared::{Block, BlockFormat, BlockGraph, IMAGE_BLOCK};

/// Property holding an image block's declared source.
const SOURCE_PROPERTY: &str = "source";

/// Extension used when the URL path has none.
const DEFAULT_EXTENSION: &str = "png";

/// Hex characters of the URL digest kept in the file name.
const HASH_PREFIX_LEN: usize = 16;

/// Final `.ext` of a path, 2–5 alphanumerics.
static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([A-Za-z0-9]{2,5})$").expect("extension regex"));

/// Every remote asset URL in `graph`, de-duplicated in first-seen order.
///
/// Image blocks contribute their pre-signed URL when one exists, otherwise
/// their declared source. Page covers and bookmark covers/icons are
/// collected from block formats. Only absolute http(s) URLs are kept.
pub fn extract_image_urls(graph: &BlockGraph) -> Vec<String> {
    let mut urls: IndexSet<String> = IndexSet::new();
    let mut keep = |candidate: &str| {
        if is_remote(candidate) {
            urls.insert(candidate.to_string());
        }
    };

    for (id, block) in &graph.blocks {
        if block.kind == IMAGE_BLOCK {
            let source = graph
                .signed_urls
                .get(id)
                .cloned()
                .or_else(|| declared_source(block));
            if let Some(source) = source {
                keep(&source);
            }
        }

        if let Some(format) = &block.format {
            for url in format_urls(format).into_iter().flatten() {
                keep(url);
            }
        }
    }

    urls.into_iter().collect()
}

/// Deterministic file name for `url`: 16 hex chars of its SHA-256 plus the
/// extension found on the URL path (default `png`).
pub fn generate_image_filename(url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));

    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let extension = EXTENSION_RE
        .captures(&path)
        .and_then(|c| c.get(1))
        .map_or(DEFAULT_EXTENSION, |m| m.as_str());

    format!("{}.{extension}", &digest[..HASH_PREFIX_LEN])
}

/// A copy of `graph` with every collected URL replaced through `url_map`.
///
/// URLs without an entry are left as they are. `graph` itself is never
/// modified.
pub fn map_images(graph: &BlockGraph, url_map: &IndexMap<String, String>) -> BlockGraph {
    let mut mapped = graph.clone();

    for block in mapped.blocks.values_mut() {
        if block.kind == IMAGE_BLOCK {
            if let Some(source) = block
                .properties
                .as_mut()
                .and_then(|props| props.get_mut(SOURCE_PROPERTY))
            {
                source.map_text(|text| url_map.get(text).cloned());
            }
            if let Some(format) = block.format.as_mut() {
                remap(&mut format.display_source, url_map);
            }
        }

        if let Some(format) = block.format.as_mut() {
            remap(&mut format.page_cover, url_map);
            remap(&mut format.bookmark_cover, url_map);
            remap(&mut format.bookmark_icon, url_map);
        }
    }

    for signed in mapped.signed_urls.values_mut() {
        if let Some(local) = url_map.get(signed.as_str()) {
            signed.clone_from(local);
        }
    }

    mapped
}

fn declared_source(block: &Block) -> Option<String> {
    block
        .property(SOURCE_PROPERTY)
        .map(|s| s.plain_text())
        .filter(|s| !s.is_empty())
        .or_else(|| block.format.as_ref()?.display_source.clone())
}

fn format_urls(format: &BlockFormat) -> [Option<&str>; 3] {
    [
        format.page_cover.as_deref(),
        format.bookmark_cover.as_deref(),
        format.bookmark_icon.as_deref(),
    ]
}

fn remap(slot: &mut Option<String>, url_map: &IndexMap<String, String>) {
    if let Some(current) = slot.as_deref() {
        if let Some(local) = url_map.get(current) {
            *slot = Some(local.clone());
        }
    }
}

fn is_remote(candidate: &str) -> bool {
    Url::parse(candidate).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}
