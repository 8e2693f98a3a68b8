//! Shared types, error model, and configuration for blockpress.
//!
//! This crate is the foundation depended on by all other blockpress crates.
//! It provides:
//! - [`BlockpressError`]: the unified error type
//! - The source data model ([`BlockGraph`], [`Block`], [`RichText`])
//! - Normalized types ([`Page`], [`PropertyMapping`], [`MetadataValue`])
//! - Configuration ([`SiteConfig`], [`resolve_config`], config loading)

pub mod config;
pub mod error;
pub mod graph;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    CONFIG_FILE_NAME, CollectionConfig, CollectionInput, SiteConfig, SiteConfigInput,
    load_site_config, read_config_input, resolve_config,
};
pub use error::{BlockpressError, Result};
pub use graph::{
    Block, BlockFormat, BlockGraph, CODE_BLOCK, Decoration, IMAGE_BLOCK, PAGE_BLOCK,
    PropertySchema, RichText, TextSegment, ViewQuery,
};
pub use types::{BuildSummary, MetadataValue, Page, PropertyMapping, SiteMetadata};
