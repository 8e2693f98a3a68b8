//! Where block graphs come from.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use blockpress_shared::{BlockGraph, BlockpressError, Result};

/// A content source that can fetch one collection's block graph.
///
/// This is the single I/O boundary of a build. Errors returned here are
/// passed to the caller unchanged; no retry or timeout is added on top.
pub trait ContentSource: Send + Sync {
    fn fetch_graph(&self, source_id: &str) -> impl Future<Output = Result<BlockGraph>> + Send;
}

/// Serves graphs from `{root}/{source_id}.json`.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the graph file for `source_id`.
    ///
    /// Ids that could escape the root directory are rejected.
    pub fn path_for(&self, source_id: &str) -> Result<PathBuf> {
        let id = source_id.trim();
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(BlockpressError::Source(format!(
                "invalid source id `{source_id}`"
            )));
        }
        Ok(self.root.join(format!("{id}.json")))
    }
}

impl ContentSource for FileSource {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn fetch_graph(&self, source_id: &str) -> Result<BlockGraph> {
        let path = self.path_for(source_id)?;
        read_graph(&path)
            .await
            .map_err(|e| BlockpressError::Source(format!("{source_id}: {e}")))
    }
}

/// Read and parse one block graph JSON file.
pub async fn read_graph(path: &Path) -> Result<BlockGraph> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BlockpressError::io(path, e))?;
    let graph: BlockGraph = serde_json::from_str(&raw)
        .map_err(|e| BlockpressError::parse(format!("{}: {e}", path.display())))?;
    debug!(
        path = %path.display(),
        blocks = graph.blocks.len(),
        views = graph.views.len(),
        "graph loaded"
    );
    Ok(graph)
}
