use crate::download::{save_image, DownloadItem};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::mpsc::Sender;
use tracing::instrument;
use url::Url;

mod classify;
mod download;
mod errors;
mod link;
mod naming;
mod report;
mod retry;
mod session;
mod site;
mod transport;

pub use classify::{classify, kind_for_content_type, ResourceKind};
pub use download::SaveOutcome;
pub use errors::AgError;
pub use link::{get_full_link, select_links};
pub use naming::{file_name_for, resolve_name, split_extension, NameResolution};
pub use report::{log_file_for, Reporter, Update};
pub use retry::{with_retry, Fetcher, RetryPolicy};
pub use session::{normalize_directory, Reference, Session};
pub use site::{GalleryHost, SiteStrategy, ThumbnailHost};
pub use transport::{default_headers, HttpTransport, Transport};

#[derive(Debug, Clone, Default)]
pub struct DownloadRule {
    /// Where images are saved. Defaults to the current working directory.
    pub destination_directory: Option<PathBuf>,
    /// Overrides the site's preference for handling name collisions.
    pub unique: Option<bool>,
    /// Defaults to [`default_headers`].
    pub request_headers: Option<HashMap<String, String>>,
    pub retry: RetryPolicy,
}

/// A download session: the references collected so far and everything
/// needed to turn them into files in the destination directory.
#[derive(Debug)]
pub struct Downloader {
    session: Session,
    strategy: Arc<dyn SiteStrategy>,
    fetcher: Fetcher,
    reporter: Reporter,
}

impl Downloader {
    /// Creates a session talking HTTP with the rule's headers.
    #[instrument(skip(update_tx))]
    pub async fn new(
        reference: Reference,
        strategy: Arc<dyn SiteStrategy>,
        rule: DownloadRule,
        update_tx: Option<Sender<Update>>,
    ) -> Result<Self, AgError> {
        let headers = rule.request_headers.clone().unwrap_or_else(default_headers);
        let transport = Arc::new(HttpTransport::new(&headers)?);
        Self::with_transport(reference, strategy, rule, transport, update_tx).await
    }

    #[instrument(skip(transport, update_tx))]
    pub async fn with_transport(
        reference: Reference,
        strategy: Arc<dyn SiteStrategy>,
        rule: DownloadRule,
        transport: Arc<dyn Transport>,
        update_tx: Option<Sender<Update>>,
    ) -> Result<Self, AgError> {
        let destination_directory = normalize_directory(rule.destination_directory.as_deref())?;
        if let Err(e) = fs::create_dir_all(&destination_directory).await {
            tracing::error!("Failed to create destination directory\nError : {}", e);
            return Err(AgError::ErrorCreatingDestinationDirectory(e.to_string()));
        };

        let session = Session {
            base_url: strategy.base_url().clone(),
            album_url: None,
            album_urls: Vec::new(),
            image_urls: Vec::new(),
            unique: rule.unique.unwrap_or_else(|| strategy.unique_by_default()),
            request_headers: rule.request_headers.unwrap_or_else(default_headers),
            destination_directory,
        };
        let reporter = Reporter::new(&session.destination_directory, update_tx);
        let mut downloader = Self {
            session,
            strategy,
            fetcher: Fetcher::new(transport, rule.retry),
            reporter,
        };
        downloader.ingest(reference).await?;
        Ok(downloader)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn log_file(&self) -> &Path {
        self.reporter.log_file()
    }

    /// Forgets the single album so the next `download` doesn't process it again.
    pub fn take_album_url(&mut self) -> Option<Url> {
        self.session.album_url.take()
    }

    /// Adds a reference to the session. Lists are appended to the album list
    /// as given. A single link is probed: images are recorded, an html page
    /// becomes the current album, anything else is rejected.
    #[instrument(skip(self))]
    pub async fn ingest(&mut self, reference: Reference) -> Result<(), AgError> {
        match reference {
            Reference::List(links) => {
                let album_urls = links
                    .iter()
                    .map(|link| parse_link(link))
                    .collect::<Result<Vec<Url>, AgError>>()?;
                self.session.album_urls.extend(album_urls);
            }
            Reference::Single(link) => {
                let url = parse_link(&link)?;
                match classify(&self.fetcher, &url).await? {
                    ResourceKind::Image => self.session.image_urls.push(url),
                    ResourceKind::Html => self.session.album_url = Some(url),
                    ResourceKind::Unknown => {
                        tracing::error!("Unsupported reference {}", link);
                        return Err(AgError::UnsupportedReferenceKind(link));
                    }
                }
            }
        }
        Ok(())
    }

    /// Saves every image of the current album and of each listed album, in
    /// list order. Returns the number of files written.
    #[instrument(skip(self))]
    pub async fn download(&mut self, reference: Option<Reference>) -> Result<usize, AgError> {
        if let Some(reference) = reference {
            self.ingest(reference).await?;
        }

        let mut saved = 0;
        if let Some(album_url) = &self.session.album_url {
            saved += self.download_album(None, album_url).await?;
        }
        for (i, album_url) in self.session.album_urls.iter().enumerate() {
            saved += self.download_album(Some(i + 1), album_url).await?;
        }
        Ok(saved)
    }

    async fn download_album(
        &self,
        sequence: Option<usize>,
        album_url: &Url,
    ) -> Result<usize, AgError> {
        let hash = self.strategy.album_hash(album_url)?;
        self.reporter
            .report(Update::AlbumStarted {
                sequence,
                album_url: album_url.to_string(),
            })
            .await;
        let images = self.strategy.album_images(&self.fetcher, album_url).await?;
        self.reporter
            .report(Update::ImagesFound {
                album_url: album_url.to_string(),
                count: images.len(),
            })
            .await;
        let images: HashSet<Url> = images.into_iter().collect();
        self.save_bulk(&images, &hash).await
    }

    /// Saves `urls` one after the other. The first failing image aborts the
    /// batch. Returns the number of files written.
    #[instrument(skip(self, urls))]
    pub async fn save_bulk(&self, urls: &HashSet<Url>, hash: &str) -> Result<usize, AgError> {
        let mut count = 0;
        let mut saved = 0;
        for (i, link) in urls.iter().enumerate() {
            count = i + 1;
            if self.save_one(link, hash, Some(count)).await? {
                saved += 1;
            }
        }
        self.reporter.report(Update::BatchCompleted { count }).await;
        Ok(saved)
    }

    /// Saves the images recorded from single image references. `download`
    /// leaves them alone, callers decide when to save them.
    #[instrument(skip(self))]
    pub async fn save_direct_images(&self) -> Result<usize, AgError> {
        let mut saved = 0;
        for link in self.session.image_urls.iter() {
            if self.save_one(link, "", None).await? {
                saved += 1;
            }
        }
        Ok(saved)
    }

    async fn save_one(
        &self,
        link: &Url,
        hash: &str,
        sequence: Option<usize>,
    ) -> Result<bool, AgError> {
        let dld_item = DownloadItem {
            link: link.clone(),
            destination_dir: self.session.destination_directory.clone(),
            hash: hash.to_string(),
        };
        match save_image(&self.fetcher, &dld_item, self.session.unique).await? {
            SaveOutcome::Saved(file_name) => {
                self.reporter
                    .report(Update::Saved {
                        sequence,
                        file_name,
                    })
                    .await;
                Ok(true)
            }
            SaveOutcome::AlreadySaved(file_name) => {
                self.reporter
                    .report(Update::AlreadySaved { file_name })
                    .await;
                Ok(false)
            }
        }
    }

    /// Reports the session state.
    pub async fn info(&self) {
        let lines = [
            format!("base_url: {}", self.session.base_url),
            format!(
                "album_url: {}",
                self.session
                    .album_url
                    .as_ref()
                    .map(Url::as_str)
                    .unwrap_or_default()
            ),
            format!("album_url_list: [{}]", join_urls(&self.session.album_urls)),
            format!("image_url_list: [{}]", join_urls(&self.session.image_urls)),
            format!(
                "save_to: {}",
                self.session.destination_directory.to_string_lossy()
            ),
        ];
        for line in lines {
            self.reporter.report(Update::SessionInfo(line)).await;
        }
    }
}

fn join_urls(urls: &[Url]) -> String {
    urls.iter()
        .map(Url::as_str)
        .collect::<Vec<&str>>()
        .join(", ")
}

fn parse_link(link: &str) -> Result<Url, AgError> {
    Url::parse(link.trim()).map_err(|e| {
        tracing::error!("Error parsing url {}\nError : {}", link, e);
        AgError::InvalidUrl(link.to_string())
    })
}
