// In crates/api-client/src/lib.rs

// Thin REST clients for the supported brokerages. Each speaks its venue's
// wire format only; mapping failures onto the gateway error taxonomy happens
// in `execution`.

use std::time::Duration;

pub mod alpaca;
pub mod binance;
pub mod error;
pub mod kite;
pub mod types;

// Re-export public types
pub use alpaca::AlpacaClient;
pub use binance::BinanceClient;
pub use error::{Error, Result};
pub use kite::KiteClient;

/// Builds the shared HTTP client with a hard per-request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("atlas-trader/0.1")
        .timeout(timeout)
        .build()
        .map_err(|e| Error::ClientBuildError(e.to_string()))
}
