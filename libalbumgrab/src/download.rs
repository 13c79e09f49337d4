use crate::errors::AgError;
use crate::naming::{file_name_for, resolve_name, NameResolution};
use crate::retry::Fetcher;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

#[derive(Debug)]
pub struct DownloadItem {
    pub link: Url,
    pub destination_dir: PathBuf,
    /// Album hash, appended to the file name before the extension.
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// File name the image was written to.
    Saved(String),
    /// File name that made the image count as saved.
    AlreadySaved(String),
}

/// Saves a single image, unless its name resolves to an existing file.
/// The file is only ever created, never truncated or overwritten.
#[tracing::instrument(skip(fetcher))]
pub async fn save_image(
    fetcher: &Fetcher,
    dld_item: &DownloadItem,
    unique: bool,
) -> Result<SaveOutcome, AgError> {
    let candidate = file_name_for(&dld_item.link, &dld_item.hash)?;
    let dest_path = match resolve_name(&dld_item.destination_dir, &candidate, unique).await? {
        NameResolution::Fresh(path) => path,
        NameResolution::AlreadySaved(path) => {
            tracing::debug!(
                "File : |{}| from |{}| has already been downloaded.",
                path.to_string_lossy(),
                dld_item.link
            );
            return Ok(SaveOutcome::AlreadySaved(file_name(&path)));
        }
    };

    let content = fetcher.bytes(&dld_item.link).await?;

    let dest_file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&dest_path)
        .await
    {
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::debug!(
                "File {} appeared while downloading {}",
                dest_path.to_string_lossy(),
                dld_item.link
            );
            return Ok(SaveOutcome::AlreadySaved(file_name(&dest_path)));
        }
        Err(e) => {
            tracing::error!("Error creating file {}", dest_path.to_string_lossy());
            tracing::error!("{} | {}", e, e.kind());
            return Err(file_error(&dest_path, e));
        }
        Ok(f) => f,
    };

    write_new_file(dest_file, &dest_path, &content).await?;

    tracing::debug!(
        "Download completed for {}, file @ {}",
        &dld_item.link,
        dest_path.to_string_lossy()
    );
    Ok(SaveOutcome::Saved(file_name(&dest_path)))
}

/// Writes `content` to the freshly created `dest_file`. A failed write
/// removes the file again so a later run doesn't take it as saved.
async fn write_new_file<W>(
    mut dest_file: W,
    dest_path: &Path,
    content: &[u8],
) -> Result<(), AgError>
where
    W: AsyncWrite + Unpin,
{
    let written = match dest_file.write_all(content).await {
        Ok(()) => dest_file.flush().await,
        Err(e) => Err(e),
    };
    drop(dest_file);
    if let Err(e) = written {
        tracing::error!(
            "Error writing to destination file {}",
            dest_path.to_string_lossy()
        );
        tracing::error!("{} | {}", e, e.kind());
        if let Err(remove_err) = fs::remove_file(dest_path).await {
            tracing::error!(
                "Partial file {} could not be removed. {}",
                dest_path.to_string_lossy(),
                remove_err
            );
        }
        return Err(file_error(dest_path, e));
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_error(path: &Path, e: std::io::Error) -> AgError {
    AgError::FileOperationError {
        file_name: path.to_string_lossy().to_string(),
        message: format!("{} | {}", e, e.kind()),
    }
}
