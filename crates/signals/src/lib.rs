// In crates/signals/src/lib.rs

use async_trait::async_trait;
use core_types::TradeSignal;

pub mod channel;
pub mod error;
pub mod factory;
pub mod inbox;

// Re-export public types
pub use channel::ChannelSignalSource;
pub use error::{Error, Result};
pub use factory::sources_from_settings;
pub use inbox::JsonlInbox;

/// The universal interface for anything that produces trade signals.
///
/// Analyzers live outside the pipeline. A source only hands over the signals
/// that arrived since the last pull; each signal is returned exactly once.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// The name of the source.
    fn name(&self) -> &'static str;

    /// Returns every signal that arrived since the previous call.
    async fn pull(&self) -> Result<Vec<TradeSignal>>;
}
