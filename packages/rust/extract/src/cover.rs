//! Mapping raw cover references to fetchable URLs.

use url::Url;

use blockpress_shared::Block;

/// Default origin of the content source.
pub const DEFAULT_SOURCE_ORIGIN: &str = "https://www.notion.so";

/// Hosts whose uploads require the source's signed image proxy.
const HOSTED_UPLOAD_HOSTS: &[&str] = &[
    "secure.notion-static.com",
    "prod-files-secure.s3.us-west-2.amazonaws.com",
    "s3.us-west-2.amazonaws.com",
];

/// Turns a raw asset reference on `block` into a URL a renderer can load.
pub trait ImageUrlMapper: Send + Sync {
    fn map_url(&self, raw: &str, block: &Block) -> String;
}

impl<F> ImageUrlMapper for F
where
    F: Fn(&str, &Block) -> String + Send + Sync,
{
    fn map_url(&self, raw: &str, block: &Block) -> String {
        self(raw, block)
    }
}

/// The content source's own resolution rules.
///
/// - `data:` URIs and third-party absolute URLs pass through.
/// - Source-relative paths (`/images/...`) are joined to the origin.
/// - Hosted uploads are routed through `{origin}/image/{encoded}` with the
///   owning block id attached.
#[derive(Debug, Clone)]
pub struct SourceImageProxy {
    origin: String,
}

impl SourceImageProxy {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for SourceImageProxy {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_ORIGIN)
    }
}

impl ImageUrlMapper for SourceImageProxy {
    fn map_url(&self, raw: &str, block: &Block) -> String {
        if raw.is_empty() || raw.starts_with("data:") {
            return raw.to_string();
        }
        if raw.starts_with('/') {
            return format!("{}{raw}", self.origin);
        }

        let hosted = Url::parse(raw)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .is_some_and(|host| HOSTED_UPLOAD_HOSTS.iter().any(|h| host == *h));

        if hosted {
            let encoded: String = url::form_urlencoded::byte_serialize(raw.as_bytes()).collect();
            format!("{}/image/{encoded}?table=block&id={}", self.origin, block.id)
        } else {
            raw.to_string()
        }
    }
}
