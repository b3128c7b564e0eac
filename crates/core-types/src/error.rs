// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Unrecognized order side: {0}")]
    UnknownSide(String),

    #[error("Unrecognized signal source: {0}")]
    UnknownSource(String),
}

pub type Result<T> = std::result::Result<T, Error>;
