//! Per site album traversal.
//!
//! A [`SiteStrategy`] knows how one site lays out its albums: which pages to
//! walk from an album page to the final image urls, and how to derive the
//! album hash used to keep file names from different albums apart. Adding a
//! site means adding an implementation here, the engine stays untouched.

use crate::errors::AgError;
use crate::retry::Fetcher;
use futures::future::BoxFuture;
use url::Url;

mod gallery;
mod thumbnail;

pub use gallery::GalleryHost;
pub use thumbnail::ThumbnailHost;

pub trait SiteStrategy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Root of the site, relative links are resolved against it.
    fn base_url(&self) -> &Url;

    /// Image urls of an album. May contain duplicates, the engine removes them.
    fn album_images<'a>(
        &'a self,
        _fetcher: &'a Fetcher,
        _album_url: &'a Url,
    ) -> BoxFuture<'a, Result<Vec<Url>, AgError>> {
        Box::pin(async move { Err(AgError::UnimplementedStrategy(self.name().to_string())) })
    }

    /// Suffix appended to every file name saved from `album_url`.
    fn album_hash(&self, _album_url: &Url) -> Result<String, AgError> {
        Ok(String::new())
    }

    /// Whether name collisions get a counter suffix (true) or mean the image
    /// was already saved (false), unless the caller overrides it.
    fn unique_by_default(&self) -> bool {
        true
    }
}
