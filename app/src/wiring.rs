// In app/src/wiring.rs

use advisor::{ChatCompletionAdvisor, PlanAdvisor};
use anyhow::{Context, Result};
use app_config::Settings;
use database::{ContextSource, JsonlJournal, TradeRecordSink};
use engine::{Engine, ExecutionPipeline, PipelineTimeouts, PositionBook};
use num_traits::FromPrimitive;
use risk::{FixedFractionalRiskManager, RiskConfig, RiskManager};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Builds every collaborator named in `settings` and assembles the engine.
pub async fn build_engine(settings: &Settings) -> Result<Engine> {
    // --- 1. Risk ---
    let risk_config = RiskConfig::try_from(&settings.risk)?;
    tracing::info!(
        max_risk_per_trade = %risk_config.max_risk_per_trade,
        min_reward_ratio = %risk_config.min_reward_ratio,
        max_positions = risk_config.max_positions,
        require_target = risk_config.require_target,
        "Risk limits loaded."
    );
    let risk: Arc<dyn RiskManager> = Arc::new(FixedFractionalRiskManager::new(risk_config.clone()));

    // --- 2. Venue ---
    let gateway = execution::gateway_from_settings(&settings.broker, settings.pipeline.broker_timeout())?;
    if !matches!(settings.broker.venue, app_config::Venue::Paper) {
        tracing::warn!(venue = ?settings.broker.venue, "LIVE VENUE SELECTED. REAL ORDERS WILL BE PLACED.");
    }

    // --- 3. Advisors ---
    let advisor_timeout = settings.pipeline.advisor_timeout();
    let primary: Arc<dyn PlanAdvisor> = Arc::new(ChatCompletionAdvisor::new(
        settings.advisor.primary.clone(),
        "primary",
        advisor_timeout,
    )?);

    // --- 4. Equity and positions ---
    let equity = Decimal::from_f64(settings.pipeline.initial_equity)
        .context("pipeline.initial_equity is not representable as a decimal")?;
    let book = Arc::new(PositionBook::new(equity, risk_config.max_positions));

    let mut pipeline = ExecutionPipeline::new(risk, gateway, primary, book)
        .with_timeouts(PipelineTimeouts::from(&settings.pipeline));

    if let Some(endpoint) = &settings.advisor.fallback {
        let fallback = ChatCompletionAdvisor::new(endpoint.clone(), "fallback", advisor_timeout)?;
        pipeline = pipeline.with_fallback(Arc::new(fallback));
    }

    // --- 5. Journal, trade log and context ---
    let journal = Arc::new(JsonlJournal::new(&settings.journal.path, settings.journal.context_limit));
    pipeline = pipeline
        .with_sink(journal.clone() as Arc<dyn TradeRecordSink>)
        .with_context(journal as Arc<dyn ContextSource>);

    if let Some(db_settings) = &settings.database {
        let db = database::connect(db_settings, settings.journal.context_limit)
            .await
            .context("Failed to connect to the trade log database")?;
        tracing::info!("Database connection established and migrations are up-to-date.");
        pipeline = pipeline.with_sink(Arc::new(db));
    }

    // --- 6. Signal sources ---
    let sources = signals::sources_from_settings(&settings.signals)?;
    if sources.is_empty() {
        anyhow::bail!("No signal sources configured. Set signals.inbox_path.");
    }

    Ok(Engine::new(
        Arc::new(pipeline),
        sources,
        settings.market.session(),
        settings.pipeline.poll_interval(),
        settings.pipeline.max_concurrent_signals,
    ))
}
