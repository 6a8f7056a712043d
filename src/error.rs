use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("translation fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("malformed translation document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no source URL registered for custom version: {0}")]
    MissingSource(String),

    #[error("loading version {version} failed: {message}")]
    Load { version: String, message: String },

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}
