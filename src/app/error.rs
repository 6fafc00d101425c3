use thiserror::Error;

#[derive(Error, Debug)]
pub enum FreshetError {
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Remote returned HTTP {0}")]
    Remote(reqwest::StatusCode),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FreshetError>;

/// Coarse classification callers can switch on when deciding retry UX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    Timeout,
    Http,
    Storage,
    Other,
}

impl FreshetError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::Transport(e) if e.is_timeout() => SyncErrorKind::Timeout,
            Self::Transport(_) | Self::Remote(_) => SyncErrorKind::Http,
            Self::Storage(_) => SyncErrorKind::Storage,
            _ => SyncErrorKind::Other,
        }
    }

    /// A load that failed with a retryable error left the cache untouched
    /// and may be reissued as-is.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), SyncErrorKind::Other)
    }
}
