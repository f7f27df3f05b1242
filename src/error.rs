use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A framework could not be wired together. Raised before any compilation.
    #[error("construction error: {0}")]
    Construction(String),
    #[error("failed to load config {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("scan error: {0}")]
    Scan(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
