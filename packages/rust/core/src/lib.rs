//! Site build orchestration for blockpress.
//!
//! This crate ties together schema inference, page extraction, the plugin
//! pipeline, and image relocation into end-to-end workflows
//! (e.g., [`build_site`]).

pub mod build;
pub mod images;
pub mod source;

pub use build::{ProgressReporter, Route, SilentProgress, SiteBuild, build_site};
pub use images::{LocalizedGraph, localize_images};
pub use source::{ContentSource, FileSource, read_graph};
