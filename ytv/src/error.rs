use std::io;
use thiserror::Error;

/// Marker the downloader embeds in its failure text when a request was rate limited
pub const RATE_LIMIT_MARKER: &str = "429";

pub type YtvResult<T> = Result<T, YtvError>;

#[derive(Debug, Error)]
pub enum YtvError {
    /// The downloader ran and reported a failure
    #[error("download failed: {message}")]
    Download { message: String },

    #[error("could not run downloader `{program}`: {source}")]
    DownloaderUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("could not determine the home directory")]
    HomeDirectoryNotFound,

    #[error("file system error: {source}")]
    FileSystem {
        #[from]
        source: io::Error,
    },

    #[error("invalid configuration: {message}")]
    Configuration { message: String },
}

impl YtvError {
    /// Whether the failure text carries the rate-limit marker.
    ///
    /// This is a plain substring match on the downloader's message; the
    /// downloader does not expose a structured status code.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            YtvError::Download { message } => message.contains(RATE_LIMIT_MARKER),
            _ => false,
        }
    }

    /// Whether a more conservative attempt could succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        self.is_rate_limited()
    }
}
