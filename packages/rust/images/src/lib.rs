//! Image relocation for block graphs.
//!
//! This crate provides:
//! - [`extract_image_urls`]: every remote asset URL a graph references
//! - [`generate_image_filename`]: deterministic local file names
//! - [`download_images`]: bounded, batch-parallel downloads that never fail
//! - [`map_images`]: a rewritten copy of a graph pointing at local assets

mod download;
mod urls;

pub use download::{DownloadOptions, ImageMap, ProgressFn, download_images};
pub use urls::{extract_image_urls, generate_image_filename, map_images};
