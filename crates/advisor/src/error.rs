// In crates/advisor/src/error.rs

use thiserror::Error;

/// Why an advisor produced no plan.
///
/// None of these are fatal: the pipeline treats every variant as an absent
/// plan and moves on to the fallback advisor or drops the signal.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to build the advisor client: {0}")]
    ClientBuildError(String),
    #[error("Advisor request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Advisor returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Advisor reply has no message content")]
    EmptyReply,
    #[error("Advisor reply is not a valid plan: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Advisor plan failed validation: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, Error>;
