// In crates/app-config/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load configuration")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid risk configuration: {0}")]
    RiskError(#[from] risk::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing credential `{field}` for {section}")]
    MissingCredential { section: &'static str, field: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
