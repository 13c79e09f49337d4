use crate::errors::AgError;
use crate::report::log_file_for;
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameResolution {
    /// Nothing exists at this path yet, the image should be written there.
    Fresh(PathBuf),
    /// The image is considered saved already, nothing should be written.
    AlreadySaved(PathBuf),
}

/// Splits `name` into stem and extension at the last dot. The extension keeps
/// its dot. Leading dots don't start an extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => name.split_at(idx),
        _ => (name, ""),
    }
}

/// File name for an image: the decoded last path segment of its url, with
/// the album hash placed before the extension.
pub fn file_name_for(url: &Url, hash: &str) -> Result<String, AgError> {
    let last_segment = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default();
    let decoded = urlencoding::decode_binary(last_segment.as_bytes());
    let last_segment = String::from_utf8_lossy(&decoded);
    if last_segment.is_empty() || last_segment.contains(['/', '\\']) {
        tracing::error!("File name can't be determined for {}", url);
        return Err(AgError::InvalidUrl(url.to_string()));
    }
    let (stem, ext) = split_extension(&last_segment);
    Ok(format!("{stem}{hash}{ext}"))
}

/// Decides where `candidate` should be written inside `dir`.
///
/// With `unique` set, an existing file makes the name `stem(n).ext` where `n`
/// is the number of directory entries starting with `stem`, not counting the
/// session log. The new name is checked again before it is handed out.
pub async fn resolve_name(
    dir: &Path,
    candidate: &str,
    unique: bool,
) -> Result<NameResolution, AgError> {
    let path = dir.join(candidate);
    if !path.exists() {
        return Ok(NameResolution::Fresh(path));
    }
    if !unique {
        return Ok(NameResolution::AlreadySaved(path));
    }

    let (stem, ext) = split_extension(candidate);
    let count = count_entries_starting_with(dir, stem).await?;
    let path = dir.join(format!("{stem}({count}){ext}"));
    tracing::debug!("{} exists, trying {}", candidate, path.to_string_lossy());
    if path.exists() {
        Ok(NameResolution::AlreadySaved(path))
    } else {
        Ok(NameResolution::Fresh(path))
    }
}

async fn count_entries_starting_with(dir: &Path, prefix: &str) -> Result<usize, AgError> {
    let to_error = |e: std::io::Error| AgError::FileOperationError {
        file_name: dir.to_string_lossy().to_string(),
        message: format!("{} | {}", e, e.kind()),
    };
    let log_file = log_file_for(dir);
    let mut entries = fs::read_dir(dir).await.map_err(to_error)?;
    let mut count = 0;
    while let Some(entry) = entries.next_entry().await.map_err(to_error)? {
        if entry.path() == log_file {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            count += 1;
        }
    }
    Ok(count)
}
