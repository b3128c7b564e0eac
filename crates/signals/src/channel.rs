// In crates/signals/src/channel.rs

use crate::{Result, SignalSource};
use async_trait::async_trait;
use core_types::TradeSignal;
use tokio::sync::{mpsc, Mutex};

/// A source fed by in-process analyzers over an mpsc channel.
#[derive(Debug)]
pub struct ChannelSignalSource {
    rx: Mutex<mpsc::Receiver<TradeSignal>>,
}

impl ChannelSignalSource {
    /// Creates a source and the sender analyzers push signals into.
    pub fn channel(capacity: usize) -> (mpsc::Sender<TradeSignal>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx: Mutex::new(rx) })
    }
}

#[async_trait]
impl SignalSource for ChannelSignalSource {
    fn name(&self) -> &'static str {
        "ChannelSignalSource"
    }

    async fn pull(&self) -> Result<Vec<TradeSignal>> {
        let mut rx = self.rx.lock().await;
        let mut signals = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            if signal.is_well_formed() {
                signals.push(signal);
            } else {
                tracing::warn!(symbol = %signal.symbol, "Dropping malformed signal.");
            }
        }
        Ok(signals)
    }
}
