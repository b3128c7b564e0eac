// In crates/api-client/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to build the API client: {0}")]
    ClientBuildError(String),
    #[error("Request timed out: {0}")]
    Timeout(reqwest::Error),
    #[error("Could not connect to venue: {0}")]
    Connect(reqwest::Error),
    #[error("Request failed: {0}")]
    RequestFailed(reqwest::Error),
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(#[from] serde_json::Error),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("API error: code {code}, msg: {msg}")]
    ApiError { status: u16, code: i64, msg: String },
    #[error("Kite {error_type} (HTTP {status}): {message}")]
    KiteError {
        status: u16,
        error_type: String,
        message: String,
    },
    #[error("Response is missing `{0}`")]
    MissingField(&'static str),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err)
        } else if err.is_connect() {
            Error::Connect(err)
        } else {
            Error::RequestFailed(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
