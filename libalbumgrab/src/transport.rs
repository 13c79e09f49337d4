use crate::errors::AgError;
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{header, Client};
use std::collections::HashMap;
use std::error::Error;
use std::io::ErrorKind;
use std::time::Duration;
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/103.0.0.0 Safari/537.36";

/// Headers sent with every request unless the caller provides its own set.
pub fn default_headers() -> HashMap<String, String> {
    HashMap::from([
        ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
        ("Accept-Encoding".to_string(), "*".to_string()),
        ("Accept".to_string(), "*/*".to_string()),
        ("Connection".to_string(), "keep-alive".to_string()),
    ])
}

/// The network operations the pipeline needs. A connection level failure
/// must come back as [`AgError::NetworkError`] so callers can retry it.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Content type of the resource, regardless of the response status.
    fn head<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Option<String>, AgError>>;

    fn get_text<'a>(
        &'a self,
        url: &'a Url,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<String, AgError>>;

    fn get_bytes<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>, AgError>>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(headers: &HashMap<String, String>) -> Result<Self, AgError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AgError::InvalidHeader(format!("{name} | {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AgError::InvalidHeader(format!("{name} | {e}")))?;
            header_map.insert(name, value);
        }
        let client = Client::builder()
            .default_headers(header_map)
            .build()
            .map_err(|e| AgError::RequestError {
                url: "".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    async fn get(
        &self,
        url: &Url,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, AgError> {
        let mut request = self.client.get(url.as_str());
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(|e| map_request_error(url, e))?;
        if !response.status().is_success() {
            tracing::error!(
                "Error status code received : {} |{}|",
                response.status(),
                url
            );
            return Err(AgError::ErrorStatusCode {
                status_code: response.status().to_string(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

impl Transport for HttpTransport {
    fn head<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Option<String>, AgError>> {
        Box::pin(async move {
            let response = self
                .client
                .head(url.as_str())
                .send()
                .await
                .map_err(|e| map_request_error(url, e))?;
            Ok(response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string))
        })
    }

    fn get_text<'a>(
        &'a self,
        url: &'a Url,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<String, AgError>> {
        Box::pin(async move {
            self.get(url, timeout)
                .await?
                .text()
                .await
                .map_err(|e| map_request_error(url, e))
        })
    }

    fn get_bytes<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>, AgError>> {
        Box::pin(async move {
            let body = self
                .get(url, None)
                .await?
                .bytes()
                .await
                .map_err(|e| map_request_error(url, e))?;
            Ok(body.to_vec())
        })
    }
}

fn map_request_error(url: &Url, e: reqwest::Error) -> AgError {
    tracing::error!("Error fetching {}", url);
    tracing::error!("{}", e);
    if e.is_connect() || e.is_timeout() || connection_dropped(&e) {
        AgError::NetworkError(format!("{url} | {e}"))
    } else {
        AgError::RequestError {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Whether the peer closed or reset a connection it had accepted, anywhere
/// down the source chain of `e`.
fn connection_dropped(e: &(dyn Error + 'static)) -> bool {
    let mut source = Some(e);
    while let Some(err) = source {
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() || hyper_err.is_closed() {
                return true;
            }
        }
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io_err.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}
