use crate::errors::AgError;
use crate::link::select_links;
use crate::retry::Fetcher;
use crate::site::SiteStrategy;
use futures::future::BoxFuture;
use lazy_static::lazy_static;
use scraper::Selector;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// The site is slow to render large albums.
const ALBUM_PAGE_TIMEOUT: Duration = Duration::from_secs(30 * 100);

lazy_static! {
    static ref REL_LINK: Selector = Selector::parse(".rel-link[href]").unwrap();
}

/// Site where the album page links straight to the full size images.
#[derive(Debug, Clone)]
pub struct ThumbnailHost {
    base_url: Url,
}

impl ThumbnailHost {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }
}

impl SiteStrategy for ThumbnailHost {
    fn name(&self) -> &'static str {
        "ThumbnailHost"
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn album_images<'a>(
        &'a self,
        fetcher: &'a Fetcher,
        album_url: &'a Url,
    ) -> BoxFuture<'a, Result<Vec<Url>, AgError>> {
        Box::pin(async move {
            let html = fetcher.text(album_url, Some(ALBUM_PAGE_TIMEOUT)).await?;
            Ok(image_links(&html, album_url))
        })
    }

    fn unique_by_default(&self) -> bool {
        false
    }
}

fn image_links(html: &str, album_url: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    select_links(html, &REL_LINK, "href", album_url)
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
