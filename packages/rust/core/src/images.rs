//! Relocating a page graph's images to local storage.

use std::path::Path;

use tracing::{info, instrument};

use blockpress_images::{DownloadOptions, ImageMap, download_images, map_images};
use blockpress_shared::BlockGraph;

/// A graph rewritten to point at downloaded images.
#[derive(Debug, Clone)]
pub struct LocalizedGraph {
    pub graph: BlockGraph,
    /// Remote URL → local reference, successful downloads only.
    pub images: ImageMap,
}

/// Download every image in `graph` into `dir` and return a remapped copy.
///
/// URLs that failed to download keep their remote value in the copy.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn localize_images(
    graph: &BlockGraph,
    dir: &Path,
    options: &DownloadOptions,
) -> LocalizedGraph {
    let images = download_images(graph, dir, options).await;
    let localized = map_images(graph, &images);
    info!(images = images.len(), "graph localized");
    LocalizedGraph {
        graph: localized,
        images,
    }
}

#[cfg(test)]
mod tests {
    use blockpress_shared::{Block, BlockFormat};

    use super::*;

    #[tokio::test]
    async fn covers_point_at_local_files() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/cover.jpg"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8]))
            .mount(&server)
            .await;

        let ok = format!("{}/cover.jpg", server.uri());
        let gone = format!("{}/gone.jpg", server.uri());
        let mut graph = BlockGraph::default();
        for (id, cover) in [("p1", &ok), ("p2", &gone)] {
            graph.blocks.insert(
                id.into(),
                Block {
                    id: id.into(),
                    kind: "page".into(),
                    format: Some(BlockFormat {
                        page_cover: Some(cover.clone()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            );
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let options = DownloadOptions {
            url_prefix: Some("/static/images".into()),
            ..Default::default()
        };
        let localized = localize_images(&graph, dir.path(), &options).await;

        let cover = |id: &str| {
            localized.graph.blocks[id]
                .format
                .as_ref()
                .and_then(|f| f.page_cover.clone())
        };
        assert!(cover("p1").is_some_and(|c| c.starts_with("/static/images/")));
        assert_eq!(cover("p2"), Some(gone));
        assert_eq!(localized.images.len(), 1);
        // The input graph is untouched.
        assert_eq!(
            graph.blocks["p1"].format.as_ref().and_then(|f| f.page_cover.clone()),
            Some(ok)
        );
    }
}
