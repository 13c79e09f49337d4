use crate::errors::AgError;
use crate::link::select_links;
use crate::retry::Fetcher;
use crate::site::SiteStrategy;
use futures::future::BoxFuture;
use lazy_static::lazy_static;
use scraper::Selector;
use std::collections::BTreeSet;
use tracing::instrument;
use url::Url;

/// Position of the album id in the `/` separated album url,
/// e.g. `https://host/actress/164947/name.aspx`.
const HASH_SEGMENT_INDEX: usize = 4;

lazy_static! {
    /// Album page => one page per image.
    static ref IMAGE_PAGE_LINK: Selector = Selector::parse("#galdiv a").unwrap();
    /// Image page => full size image.
    static ref FULL_VIEW_IMAGE: Selector = Selector::parse("#galimgview img").unwrap();
    /// Profile or listing page => album pages.
    static ref ALBUM_LINK: Selector = Selector::parse("#galleries_panel .galimg").unwrap();
    static ref PAGING_LINK: Selector = Selector::parse("#pagingCell a").unwrap();
}

/// Site where an album page links to one page per image and every such
/// page shows the full size image.
#[derive(Debug, Clone)]
pub struct GalleryHost {
    base_url: Url,
}

impl GalleryHost {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Album pages listed on `page_url`.
    #[instrument(skip(fetcher))]
    pub async fn album_links(
        &self,
        fetcher: &Fetcher,
        page_url: &Url,
    ) -> Result<Vec<Url>, AgError> {
        let html = fetcher.text(page_url, None).await?;
        let links = select_links(&html, &ALBUM_LINK, "href", &self.base_url);
        tracing::info!("Found album link: {}", links.len());
        Ok(links)
    }

    /// Every album page reachable from a profile page, including the extra
    /// pages of paginated albums.
    #[instrument(skip(fetcher))]
    pub async fn discover_albums(
        &self,
        fetcher: &Fetcher,
        profile_url: &Url,
    ) -> Result<BTreeSet<Url>, AgError> {
        let mut albums = BTreeSet::new();
        for album_url in self.album_links(fetcher, profile_url).await? {
            let html = fetcher.text(&album_url, None).await?;
            albums.extend(select_links(&html, &PAGING_LINK, "href", &self.base_url));
            albums.insert(album_url);
        }
        tracing::info!("Found albums: {}", albums.len());
        Ok(albums)
    }
}

impl SiteStrategy for GalleryHost {
    fn name(&self) -> &'static str {
        "GalleryHost"
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
            let album_html = fetcher.text(album_url, None).await?;
            let image_pages = select_links(&album_html, &IMAGE_PAGE_LINK, "href", &self.base_url);
            tracing::debug!("{} image pages in {}", image_pages.len(), album_url);
            let mut images = Vec::new();
            for page_url in image_pages.iter() {
                let page_html = fetcher.text(page_url, None).await?;
                images.extend(select_links(&page_html, &FULL_VIEW_IMAGE, "src", page_url));
            }
            Ok(images)
        })
    }

    fn album_hash(&self, album_url: &Url) -> Result<String, AgError> {
        let segment = album_url
            .as_str()
            .split('/')
            .nth(HASH_SEGMENT_INDEX)
            .unwrap_or_default();
        match segment.parse::<i64>() {
            Ok(id) => Ok(format!("-{id}")),
            Err(_) => Err(AgError::InvalidAlbumHash {
                url: album_url.to_string(),
                segment: segment.to_string(),
            }),
        }
    }

    fn unique_by_default(&self) -> bool {
        false
    }
}
