// In crates/database/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),
    #[error("Database migration failed: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("Database operation failed: {0}")]
    OperationFailed(sqlx::Error),
    #[error("Journal I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode trade record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Stored value is not a valid {field}: {value}")]
    InvalidColumn { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
