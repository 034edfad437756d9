use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Missing request context: {0}")]
    MissingContext(&'static str),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

pub type ScraperResult<T> = Result<T, ScraperError>;
