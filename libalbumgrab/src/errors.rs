use std::fmt::Formatter;

#[derive(Debug, PartialEq)]
pub enum AgError {
    ErrorCreatingDestinationDirectory(String),
    /// The reference is neither an html page nor a known image type.
    UnsupportedReferenceKind(String),
    /// Connection level failure. The only error worth retrying.
    NetworkError(String),
    RetriesExhausted {
        url: String,
        attempts: u32,
        message: String,
    },
    /// Parameter is the strategy name
    UnimplementedStrategy(String),
    InvalidAlbumHash {
        url: String,
        segment: String,
    },
    ErrorStatusCode {
        status_code: String,
        url: String,
    },
    RequestError {
        url: String,
        message: String,
    },
    /// parameters are file path, additional error message
    FileOperationError {
        file_name: String,
        message: String,
    },
    InvalidUrl(String),
    InvalidHeader(String),
    UnknownError(String),
}

impl AgError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AgError::NetworkError(_))
    }
}

impl std::fmt::Display for AgError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            AgError::ErrorCreatingDestinationDirectory(err) => {
                format!("error creating destination directory. {err}")
            }
            AgError::UnsupportedReferenceKind(reference) => {
                format!("{reference} type is not allowed")
            }
            AgError::NetworkError(err) => format!("error connecting to internet. {err}"),
            AgError::RetriesExhausted {
                url,
                attempts,
                message,
            } => format!("gave up on {url} after {attempts} attempts. {message}"),
            AgError::UnimplementedStrategy(name) => {
                format!("{name} is missing the implementation of album image resolution")
            }
            AgError::InvalidAlbumHash { url, segment } => {
                format!("can not derive album hash from {url}, segment |{segment}| is not a number")
            }
            AgError::ErrorStatusCode { status_code, url } => {
                format!("server returned an error response. {url} => {status_code}")
            }
            AgError::RequestError { url, message } => {
                format!("request to {url} failed. {message}")
            }
            AgError::FileOperationError { file_name, message } => {
                format!("{message} : {file_name}")
            }
            AgError::InvalidUrl(url) => format!("Invalid url received : {url}"),
            AgError::InvalidHeader(header) => format!("Invalid request header : {header}"),
            AgError::UnknownError(err) => format!("an unknown error occurred. {err}"),
        };
        write!(f, "{str}")
    }
}

impl std::error::Error for AgError {}
