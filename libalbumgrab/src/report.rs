use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::Sender;

const FALLBACK_LOG_NAME: &str = "albumgrab";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    SessionInfo(String),
    /// `sequence` is the 1-based position in the album list, `None` for the
    /// single album of a session.
    AlbumStarted {
        sequence: Option<usize>,
        album_url: String,
    },
    ImagesFound {
        album_url: String,
        count: usize,
    },
    Saved {
        sequence: Option<usize>,
        file_name: String,
    },
    AlreadySaved {
        file_name: String,
    },
    BatchCompleted {
        count: usize,
    },
}

impl Update {
    /// The line shown on the console and written to the session log.
    pub fn line(&self) -> String {
        match self {
            Update::SessionInfo(info) => info.to_string(),
            Update::AlbumStarted {
                sequence: None,
                album_url,
            } => format!("Getting album url data from url \"{album_url}\""),
            Update::AlbumStarted {
                sequence: Some(n),
                album_url,
            } => format!("{n}) Getting album url data from url \"{album_url}\""),
            Update::ImagesFound { count, .. } => format!("Found images: {count}"),
            Update::Saved {
                sequence: Some(n),
                file_name,
            } => format!("Saved: {n}) {file_name}"),
            Update::Saved {
                sequence: None,
                file_name,
            } => format!("Single image is Saved: {file_name}"),
            Update::AlreadySaved { file_name } => format!("Already image is Saved: {file_name}"),
            Update::BatchCompleted { count } => format!("Successfully completed {count} files."),
        }
    }
}

/// The session log lives inside the destination directory and is named
/// after it, e.g. `/pictures/album/album.txt`.
pub fn log_file_for(destination_directory: &Path) -> PathBuf {
    let name = destination_directory
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| FALLBACK_LOG_NAME.to_string());
    destination_directory.join(format!("{name}.txt"))
}

/// Hands updates to the listening side of the channel, if any, and keeps a
/// timestamped record of them in the session log.
#[derive(Debug, Clone)]
pub struct Reporter {
    update_tx: Option<Sender<Update>>,
    log_file: PathBuf,
}

impl Reporter {
    pub fn new(destination_directory: &Path, update_tx: Option<Sender<Update>>) -> Self {
        Self {
            update_tx,
            log_file: log_file_for(destination_directory),
        }
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    pub async fn report(&self, update: Update) {
        let line = update.line();
        tracing::info!("{}", line);
        self.append_to_log(&line).await;
        if let Some(update_tx) = &self.update_tx {
            if (update_tx.send(update).await).is_err() {
                tracing::debug!("Update receiver dropped");
            };
        }
    }

    async fn append_to_log(&self, line: &str) {
        let entry = format!("{} {}\n", Local::now().format("%Y-%m-%d %H:%M:%S,%3f"), line);
        let result = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .await
        {
            Ok(mut file) => match file.write_all(entry.as_bytes()).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(
                "Error writing to log file {}\nError : {} | {}",
                self.log_file.to_string_lossy(),
                e,
                e.kind()
            );
        }
    }
}
