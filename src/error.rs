use std::path::PathBuf;

/// Failure of one outbound request.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetch {url}: expected a text response, got {content_type:?}")]
    NotText { url: String, content_type: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::NotText { url, .. } => url,
        }
    }

    /// `true` when another attempt has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        let Self::Transport { source, .. } = self else {
            return false;
        };
        if source.is_timeout() || source.is_connect() || source.is_request() {
            return true;
        }
        source
            .status()
            .is_some_and(|status| status.is_server_error() || status.as_u16() == 429)
    }
}

/// Markup did not have the expected shape, or a required value was malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("missing element: {what}")]
    MissingElement { what: &'static str },

    #[error("missing attribute: {what}")]
    MissingAttribute { what: &'static str },

    #[error("invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("metadata has {terms} terms but {values} values")]
    MetadataMismatch { terms: usize, values: usize },
}

#[derive(Debug, thiserror::Error)]
#[error("persist book: {source}")]
pub struct PersistError {
    #[from]
    pub source: sqlx::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no file name in asset url: {url}")]
    NoFileName { url: String },

    #[error("write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A pool slot whose worker never produced a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("worker task failed: {0}")]
    Panicked(String),

    #[error("worker task lost")]
    Lost,
}
