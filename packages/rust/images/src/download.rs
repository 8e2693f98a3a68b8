//! Batch-parallel image downloads.
//!
//! URLs are split into fixed batches of `concurrency`. A batch runs fully in
//! parallel and must finish before the next one starts, so no more than
//! `concurrency` requests are ever in flight. Failures only shrink the result.
//!
//! Bodies land in a `.part` sibling first and are renamed into place, so the
//! on-disk cache never sees a half-written image.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use reqwest::Client;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use blockpress_shared::{BlockGraph, BlockpressError, Result};

use crate::urls::{extract_image_urls, generate_image_filename};

/// User-Agent string for image requests.
const USER_AGENT: &str = concat!("blockpress/", env!("CARGO_PKG_VERSION"));

const DEFAULT_CONCURRENCY: usize = 5;

/// Remote URL → local reference, for successful downloads only.
pub type ImageMap = IndexMap<String, String>;

/// Called after every attempt with `(done, total)`.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Options for [`download_images`].
#[derive(Clone)]
pub struct DownloadOptions {
    /// Batch size; values below 1 are treated as 1.
    pub concurrency: usize,
    pub on_progress: Option<ProgressFn>,
    /// When set, mapping values are `{url_prefix}/{filename}` instead of the
    /// file path on disk.
    pub url_prefix: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            on_progress: None,
            url_prefix: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("concurrency", &self.concurrency)
            .field("on_progress", &self.on_progress.is_some())
            .field("url_prefix", &self.url_prefix)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Download every image referenced by `graph` into `dir`.
///
/// Never fails: a non-2xx response, a transport error or a write error drops
/// that URL from the result and the run continues. A file that already
/// exists under its deterministic name counts as downloaded without a
/// request. The returned map follows the order of [`extract_image_urls`].
#[instrument(skip_all, fields(dir = %dir.display(), concurrency = options.concurrency))]
pub async fn download_images(graph: &BlockGraph, dir: &Path, options: &DownloadOptions) -> ImageMap {
    let urls = extract_image_urls(graph);
    let total = urls.len();
    if total == 0 {
        return ImageMap::new();
    }

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!(error = %e, "could not create image directory");
    }

    let client = match build_client(options.timeout) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "image downloads skipped");
            return ImageMap::new();
        }
    };

    let concurrency = options.concurrency.max(1);
    let mut saved: HashMap<String, PathBuf> = HashMap::new();
    let mut done = 0;

    for batch in urls.chunks(concurrency) {
        let mut tasks = JoinSet::new();
        for url in batch {
            let client = client.clone();
            let url = url.clone();
            let target = dir.join(generate_image_filename(&url));
            tasks.spawn(async move {
                let outcome = fetch_to_file(&client, &url, &target).await;
                (url, target, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            done += 1;
            match joined {
                Ok((url, target, Ok(()))) => {
                    saved.insert(url, target);
                }
                Ok((url, _, Err(e))) => {
                    warn!(%url, error = %e, "image download failed");
                }
                Err(e) => {
                    warn!(error = %e, "image download task failed");
                }
            }
            if let Some(on_progress) = &options.on_progress {
                on_progress(done, total);
            }
        }
    }

    let mapped: ImageMap = urls
        .into_iter()
        .filter_map(|url| {
            let target = saved.remove(&url)?;
            let local = local_reference(&target, options.url_prefix.as_deref());
            Some((url, local))
        })
        .collect();

    info!(
        total,
        downloaded = mapped.len(),
        failed = total - mapped.len(),
        "image downloads complete"
    );
    mapped
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .build()
        .map_err(|e| BlockpressError::Network(format!("failed to build HTTP client: {e}")))
}

/// Fetch `url` into `target`, skipping the request when `target` exists.
///
/// `target` only ever appears complete: the body is written to a partial
/// file that is renamed over `target` once the write succeeds.
async fn fetch_to_file(client: &Client, url: &str, target: &Path) -> Result<()> {
    if tokio::fs::try_exists(target).await.unwrap_or(false) {
        debug!(%url, path = %target.display(), "image already on disk");
        return Ok(());
    }

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| BlockpressError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BlockpressError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| BlockpressError::Network(format!("{url}: body read failed: {e}")))?;

    let partial = partial_path(target);
    let written = match tokio::fs::write(&partial, &body).await {
        Ok(()) => tokio::fs::rename(&partial, target)
            .await
            .map_err(|e| BlockpressError::io(target, e)),
        Err(e) => Err(BlockpressError::io(&partial, e)),
    };
    if written.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    written?;

    debug!(%url, bytes = body.len(), "image saved");
    Ok(())
}

/// `<target>.part`, where a download is staged before it is renamed.
fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn local_reference(target: &Path, url_prefix: Option<&str>) -> String {
    match (url_prefix, target.file_name()) {
        (Some(prefix), Some(name)) => {
            format!("{}/{}", prefix.trim_end_matches('/'), name.to_string_lossy())
        }
        _ => target.display().to_string(),
    }
}
