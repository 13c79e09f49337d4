use crate::errors::AgError;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// What a download session starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// An image or an album page, told apart by probing it.
    Single(String),
    /// Album pages, taken as is.
    List(Vec<String>),
}

impl From<&str> for Reference {
    fn from(link: &str) -> Self {
        Reference::Single(link.to_string())
    }
}

impl From<String> for Reference {
    fn from(link: String) -> Self {
        Reference::Single(link)
    }
}

impl From<Vec<String>> for Reference {
    fn from(links: Vec<String>) -> Self {
        Reference::List(links)
    }
}

impl From<Vec<&str>> for Reference {
    fn from(links: Vec<&str>) -> Self {
        Reference::List(links.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub base_url: Url,
    /// The single "current" album. Replaced, never cleared, by ingestion.
    pub album_url: Option<Url>,
    pub album_urls: Vec<Url>,
    /// Direct image references. Not saved by `download`.
    pub image_urls: Vec<Url>,
    /// Absolute and normalized.
    pub destination_directory: PathBuf,
    pub unique: bool,
    pub request_headers: HashMap<String, String>,
}

/// Absolute, lexically normalized form of `path`, relative paths being taken
/// from the current directory. `None` means the current directory.
pub fn normalize_directory(path: Option<&Path>) -> Result<PathBuf, AgError> {
    let current_dir = std::env::current_dir().map_err(|e| AgError::FileOperationError {
        file_name: ".".to_string(),
        message: format!("{} | {}", e, e.kind()),
    })?;
    let joined = match path {
        Some(path) => current_dir.join(path),
        None => current_dir,
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}
