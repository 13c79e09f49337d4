#![allow(dead_code)]

use futures::future::{ready, BoxFuture};
use libalbumgrab::{AgError, Transport};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use url::Url;

/// Serves canned responses and can be told to fail a url with connection
/// errors a given number of times before answering.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    content_types: HashMap<String, String>,
    pages: HashMap<String, String>,
    images: HashMap<String, Vec<u8>>,
    failures: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(mut self, url: &str, content_type: &str) -> Self {
        self.content_types
            .insert(url.to_string(), content_type.to_string());
        self
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn image(mut self, url: &str, content: &[u8]) -> Self {
        self.images.insert(url.to_string(), content.to_vec());
        self
    }

    pub fn failing(self, url: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), times);
        self
    }

    /// Requests made so far, e.g. `GET https://x/a`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, verb: &str, url: &Url) -> Result<(), AgError> {
        self.calls.lock().unwrap().push(format!("{verb} {url}"));
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(url.as_str()) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(AgError::NetworkError(format!("{url} | connection refused")))
            }
            _ => Ok(()),
        }
    }

    fn not_found(url: &Url) -> AgError {
        AgError::ErrorStatusCode {
            status_code: "404 Not Found".to_string(),
            url: url.to_string(),
        }
    }
}

impl Transport for ScriptedTransport {
    fn head<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Option<String>, AgError>> {
        let result = self
            .record("HEAD", url)
            .map(|_| self.content_types.get(url.as_str()).cloned());
        Box::pin(ready(result))
    }

    fn get_text<'a>(
        &'a self,
        url: &'a Url,
        _timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<String, AgError>> {
        let result = self.record("GET", url).and_then(|_| {
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| Self::not_found(url))
        });
        Box::pin(ready(result))
    }

    fn get_bytes<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>, AgError>> {
        let result = self.record("GET", url).and_then(|_| {
            self.images
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| Self::not_found(url))
        });
        Box::pin(ready(result))
    }
}

/// Names of the files in `dir`, without the session log, sorted.
pub fn saved_files(dir: &std::path::Path) -> Vec<String> {
    let log_file = libalbumgrab::log_file_for(dir);
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| *path != log_file)
        .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

pub async fn drain<T>(mut rx: Receiver<T>) -> Vec<T> {
    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }
    updates
}
