// In crates/database/src/lib.rs

use async_trait::async_trait;
use core_types::{Symbol, TradeRecord};

pub mod error;
pub mod journal;
pub mod postgres;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use journal::JsonlJournal;
pub use postgres::{connect, Db};

/// A durable, append-only destination for trade records.
#[async_trait]
pub trait TradeRecordSink: Send + Sync {
    /// The name of the sink (e.g., "JsonlJournal").
    fn name(&self) -> &'static str;

    /// Persists one record. Called exactly once per submitted order.
    async fn append(&self, record: &TradeRecord) -> Result<()>;
}

/// Best-effort retrieval of past rationale to give an advisor context.
#[async_trait]
pub trait ContextSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns free text relevant to `query`, or an empty string when nothing matches.
    async fn search(&self, query: &str) -> Result<String>;
}

/// Whether any whitespace-separated token of `query` is `symbol`, ignoring case.
pub(crate) fn mentions(query: &str, symbol: &Symbol) -> bool {
    query
        .split_whitespace()
        .any(|token| token.eq_ignore_ascii_case(symbol.as_str()))
}
