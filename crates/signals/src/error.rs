// In crates/signals/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Signal inbox I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode signal: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Signal is not well formed: {0}")]
    NotWellFormed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
