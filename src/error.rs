use thiserror::Error;

/// Errors raised at the library boundary. Views and the assistant session
/// catch these and turn them into state, so none of them aborts rendering.
#[derive(Debug, Error)]
pub enum FolioError {
    /// HTTP transport failure, non-2xx status, or a converter payload whose
    /// own status field reports failure.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed cached JSON, or a feed body that is neither valid JSON nor
    /// valid XML.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("assistant error: {0}")]
    Assistant(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FolioError {
    pub fn is_parse(&self) -> bool {
        matches!(self, FolioError::Parse(_))
    }
}

impl From<reqwest::Error> for FolioError {
    fn from(err: reqwest::Error) -> Self {
        FolioError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::Parse(err.to_string())
    }
}

impl From<feed_rs::parser::ParseFeedError> for FolioError {
    fn from(err: feed_rs::parser::ParseFeedError) -> Self {
        FolioError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
