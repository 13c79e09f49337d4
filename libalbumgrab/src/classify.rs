use crate::errors::AgError;
use crate::retry::Fetcher;
use phf::phf_map;
use tracing::instrument;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Html,
    Image,
    Unknown,
}

/// Probes `url` with a HEAD request and maps its content type.
#[instrument(skip(fetcher))]
pub async fn classify(fetcher: &Fetcher, url: &Url) -> Result<ResourceKind, AgError> {
    let kind = match fetcher.content_type(url).await? {
        Some(content_type) => kind_for_content_type(&content_type),
        None => {
            tracing::warn!("No content type received for {}", url);
            ResourceKind::Unknown
        }
    };
    tracing::debug!("{} classified as {:?}", url, kind);
    Ok(kind)
}

pub fn kind_for_content_type(content_type: &str) -> ResourceKind {
    let content_type = content_type.trim().to_lowercase();
    CONTENT_KINDS
        .get(content_type.as_str())
        .copied()
        .unwrap_or(ResourceKind::Unknown)
}

static CONTENT_KINDS: phf::Map<&'static str, ResourceKind> = phf_map! {
    "text/html; charset=utf-8" => ResourceKind::Html,
    "text/html" => ResourceKind::Html,
    "image/png" => ResourceKind::Image,
    "image/jpeg" => ResourceKind::Image,
    "image/jpg" => ResourceKind::Image,
};
