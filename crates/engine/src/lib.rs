// In crates/engine/src/lib.rs

pub mod book;
pub mod locks;
pub mod outcome;
pub mod pipeline;

use anyhow::Result;
use app_config::TradingHours;
use chrono::Utc;
use core_types::TradeSignal;
use signals::SignalSource;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

// Re-export public types
pub use book::{PositionBook, Reservation};
pub use locks::SymbolLocks;
pub use outcome::SignalOutcome;
pub use pipeline::{ExecutionPipeline, PipelineTimeouts};

/// The polling orchestrator.
///
/// On every tick, inside trading hours, the engine pulls all signal sources
/// and hands each signal to a bounded pool of pipeline workers. Signals that
/// arrive while every worker is busy wait in a backlog for the next tick, so
/// the polling loop itself never blocks on a slow pipeline.
pub struct Engine {
    pipeline: Arc<ExecutionPipeline>,
    sources: Vec<Arc<dyn SignalSource>>,
    session: TradingHours,
    poll_interval: Duration,
    workers: Arc<Semaphore>,
}

impl Engine {
    pub fn new(
        pipeline: Arc<ExecutionPipeline>,
        sources: Vec<Arc<dyn SignalSource>>,
        session: TradingHours,
        poll_interval: Duration,
        max_concurrent_signals: usize,
    ) -> Self {
        Self {
            pipeline,
            sources,
            session,
            poll_interval,
            workers: Arc::new(Semaphore::new(max_concurrent_signals.max(1))),
        }
    }

    /// The main run method for the orchestrator.
    ///
    /// Returns once `shutdown` is cancelled and every in-flight signal has
    /// finished.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("No signal sources configured. Nothing to poll.");
        }
        tracing::info!(
            sources = self.sources.len(),
            poll_interval = ?self.poll_interval,
            market = ?self.session.market,
            "Engine started."
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tasks: JoinSet<SignalOutcome> = JoinSet::new();
        let mut backlog: VecDeque<TradeSignal> = VecDeque::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            while let Some(joined) = tasks.try_join_next() {
                Self::reap(joined);
            }

            if !self.session.is_open(Utc::now()) {
                tracing::debug!("Market closed. Skipping poll.");
                continue;
            }

            for source in &self.sources {
                match source.pull().await {
                    Ok(signals) => backlog.extend(signals),
                    Err(e) => tracing::warn!(source = source.name(), error = %e, "Signal source failed."),
                }
            }
            self.dispatch(&mut backlog, &mut tasks);
        }

        if !backlog.is_empty() {
            tracing::warn!(dropped = backlog.len(), "Shutting down with undispatched signals.");
        }
        tracing::info!(in_flight = tasks.len(), "Shutdown requested. Draining in-flight signals.");
        while let Some(joined) = tasks.join_next().await {
            Self::reap(joined);
        }
        tracing::info!("Engine stopped.");
        Ok(())
    }

    fn dispatch(&self, backlog: &mut VecDeque<TradeSignal>, tasks: &mut JoinSet<SignalOutcome>) {
        while !backlog.is_empty() {
            let Ok(permit) = self.workers.clone().try_acquire_owned() else {
                tracing::debug!(waiting = backlog.len(), "All workers busy.");
                return;
            };
            let Some(signal) = backlog.pop_front() else {
                return;
            };
            let pipeline = Arc::clone(&self.pipeline);
            tasks.spawn(async move {
                let _permit = permit;
                pipeline.process(signal).await
            });
        }
    }

    fn reap(joined: std::result::Result<SignalOutcome, tokio::task::JoinError>) {
        match joined {
            Ok(outcome) => tracing::debug!(%outcome, "Signal finished."),
            Err(e) => tracing::error!(error = %e, "Pipeline worker panicked."),
        }
    }
}
