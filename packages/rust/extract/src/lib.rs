//! Page extraction: block graph + property mapping → typed pages.
//!
//! This crate provides:
//! - [`extract_pages`]: walks a collection's views and builds [`Page`]s
//! - [`frontmatter`]: inline `key: value` overrides from a page's first child
//! - [`ImageUrlMapper`]: resolves cover references to loadable URLs
//! - [`link_hierarchy`]: parent/child wiring for hierarchical page types
//!
//! [`Page`]: blockpress_shared::Page

pub mod cover;
pub mod dates;
pub mod extractor;
pub mod frontmatter;
pub mod hierarchy;

pub use cover::{DEFAULT_SOURCE_ORIGIN, ImageUrlMapper, SourceImageProxy};
pub use dates::{parse_date, sort_newest_first};
pub use extractor::{ExtractOptions, extract_pages, extract_pages_with_defaults};
pub use frontmatter::{apply_frontmatter, parse_frontmatter, parse_frontmatter_text};
pub use hierarchy::{is_hierarchical, link_hierarchy};
