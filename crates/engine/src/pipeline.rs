// In crates/engine/src/pipeline.rs

use crate::book::PositionBook;
use crate::locks::SymbolLocks;
use crate::outcome::SignalOutcome;
use advisor::PlanAdvisor;
use app_config::types::PipelineSettings;
use chrono::Utc;
use core_types::{Order, TradePlan, TradeRecord, TradeSignal};
use database::{ContextSource, TradeRecordSink};
use execution::{BrokerError, OrderAck, OrderGateway};
use futures::future::join_all;
use risk::{validate_plan, RejectionReason, RiskManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Upper bounds for every external call the pipeline makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTimeouts {
    pub context: Duration,
    pub advisor: Duration,
    pub broker: Duration,
    pub sink: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            context: Duration::from_secs(2),
            advisor: Duration::from_secs(30),
            broker: Duration::from_secs(10),
            sink: Duration::from_secs(5),
        }
    }
}

impl From<&PipelineSettings> for PipelineTimeouts {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            context: settings.context_timeout(),
            advisor: settings.advisor_timeout(),
            broker: settings.broker_timeout(),
            sink: settings.sink_timeout(),
        }
    }
}

/// Carries one signal from intake to a durable trade record.
///
/// `Received -> PlanRequested -> {PlanReady | PlanUnavailable} -> RiskEvaluated
/// -> {Admitted -> Submitted -> {Recorded | RecordPartial} | Rejected}`.
///
/// Every failure is contained in the returned [`SignalOutcome`]; `process`
/// never returns an error.
pub struct ExecutionPipeline {
    risk: Arc<dyn RiskManager>,
    gateway: Arc<dyn OrderGateway>,
    primary: Arc<dyn PlanAdvisor>,
    fallback: Option<Arc<dyn PlanAdvisor>>,
    context: Option<Arc<dyn ContextSource>>,
    sinks: Vec<Arc<dyn TradeRecordSink>>,
    book: Arc<PositionBook>,
    locks: SymbolLocks,
    timeouts: PipelineTimeouts,
}

impl ExecutionPipeline {
    pub fn new(
        risk: Arc<dyn RiskManager>,
        gateway: Arc<dyn OrderGateway>,
        primary: Arc<dyn PlanAdvisor>,
        book: Arc<PositionBook>,
    ) -> Self {
        Self {
            risk,
            gateway,
            primary,
            fallback: None,
            context: None,
            sinks: Vec::new(),
            book,
            locks: SymbolLocks::new(),
            timeouts: PipelineTimeouts::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn PlanAdvisor>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_context(mut self, context: Arc<dyn ContextSource>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn TradeRecordSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_timeouts(mut self, timeouts: PipelineTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn book(&self) -> &Arc<PositionBook> {
        &self.book
    }

    pub fn gateway(&self) -> &Arc<dyn OrderGateway> {
        &self.gateway
    }

    /// Runs `signal` through the whole state machine.
    #[tracing::instrument(skip_all, fields(symbol = %signal.symbol, side = %signal.side))]
    pub async fn process(&self, signal: TradeSignal) -> SignalOutcome {
        if !signal.is_well_formed() {
            tracing::warn!("Signal has an empty symbol or non-positive entry. Dropping.");
            return SignalOutcome::rejected(RejectionReason::InvalidSignal);
        }

        // --- Received -> PlanRequested ---
        let context = self.lookup_context(&signal).await;
        let Some(plan) = self.request_plan(&signal, &context).await else {
            tracing::warn!("No advisor produced a plan. Signal dropped.");
            return SignalOutcome::PlanUnavailable;
        };

        // --- PlanReady -> RiskEvaluated ---
        if let Err(violation) = validate_plan(&signal, &plan) {
            tracing::warn!(%violation, "Advisor plan failed validation.");
            return SignalOutcome::rejected(RejectionReason::InvalidPlan);
        }

        // Serialize everything from sizing to submission per symbol.
        let symbol_guard = self.locks.lock(&signal.symbol).await;

        let decision = self.risk.assess(self.book.equity(), &signal, &plan);
        if !decision.is_admitted() {
            let reason = decision
                .rejection_reason()
                .unwrap_or(RejectionReason::InsufficientEquity);
            tracing::info!(%reason, risk_manager = self.risk.name(), "Trade rejected.");
            return SignalOutcome::rejected(reason);
        }
        self.admit(signal, plan, decision.quantity(), symbol_guard).await
    }

    async fn admit(
        &self,
        signal: TradeSignal,
        plan: TradePlan,
        quantity: u64,
        symbol_guard: tokio::sync::OwnedMutexGuard<()>,
    ) -> SignalOutcome {
        // --- Max positions gate ---
        let Some(reservation) = self.book.try_reserve() else {
            tracing::info!(
                max_positions = self.book.max_positions(),
                "Position limit reached. Rejecting."
            );
            return SignalOutcome::rejected(RejectionReason::MaxPositionsReached);
        };

        // --- Admitted -> Submitted ---
        let order = Order::market(
            signal.symbol.clone(),
            signal.side,
            quantity,
            plan.stop,
            plan.target,
        );
        tracing::info!(
            client_order_id = %order.client_order_id,
            quantity,
            stop = ?order.stop_loss,
            target = ?order.take_profit,
            "Trade admitted. Submitting order."
        );

        let ack = match self.submit(&order).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(client_order_id = %order.client_order_id, error = %e, "Order not placed.");
                return SignalOutcome::broker_rejected(e);
            }
        };
        reservation.commit();
        drop(symbol_guard);
        tracing::info!(
            order_id = %ack.order_id,
            client_order_id = %order.client_order_id,
            protective_legs = ?ack.protective_legs,
            "Order submitted."
        );

        if let Some(failure) = &ack.protection_failure {
            tracing::error!(
                order_id = %ack.order_id,
                client_order_id = %order.client_order_id,
                %failure,
                "Order is open without the requested protection."
            );
        }

        // --- Submitted -> Recorded | RecordPartial ---
        let record = TradeRecord {
            timestamp: Utc::now(),
            symbol: signal.symbol,
            side: signal.side,
            quantity,
            entry_price: signal.entry_price,
            stop: plan.stop,
            target: plan.target,
            reason: plan.reason,
            order_id: ack.order_id.clone(),
            client_order_id: order.client_order_id,
            source: signal.source,
            confidence: plan.confidence,
            protected: ack.is_protected(),
        };
        self.record(record).await
    }

    async fn lookup_context(&self, signal: &TradeSignal) -> String {
        let Some(source) = &self.context else {
            return String::new();
        };
        let query = format!("{} {} trade rationale", signal.symbol, signal.reason);
        match timeout(self.timeouts.context, source.search(&query)).await {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => {
                tracing::warn!(source = source.name(), error = %e, "Context lookup failed.");
                String::new()
            }
            Err(_) => {
                tracing::warn!(source = source.name(), "Context lookup timed out.");
                String::new()
            }
        }
    }

    async fn request_plan(&self, signal: &TradeSignal, context: &str) -> Option<TradePlan> {
        let advisors = std::iter::once(&self.primary).chain(self.fallback.as_ref());
        for advisor in advisors {
            match timeout(self.timeouts.advisor, advisor.refine(signal, context)).await {
                Ok(Ok(plan)) => {
                    tracing::info!(
                        advisor = advisor.name(),
                        stop = ?plan.stop,
                        target = ?plan.target,
                        confidence = ?plan.confidence,
                        "Plan ready."
                    );
                    return Some(plan);
                }
                Ok(Err(e)) => {
                    tracing::warn!(advisor = advisor.name(), error = %e, "Advisor failed.");
                }
                Err(_) => {
                    tracing::warn!(advisor = advisor.name(), timeout = ?self.timeouts.advisor, "Advisor timed out.");
                }
            }
        }
        None
    }

    /// Places `order` once. After an ambiguous failure the venue is asked
    /// exactly once whether it knows the client order id.
    async fn submit(&self, order: &Order) -> Result<OrderAck, BrokerError> {
        let error = match timeout(self.timeouts.broker, self.gateway.place_order(order)).await {
            Ok(Ok(ack)) => return Ok(ack),
            Ok(Err(e)) => e,
            Err(_) => BrokerError::Timeout {
                detail: format!("no reply from {} within {:?}", self.gateway.name(), self.timeouts.broker),
            },
        };
        if !error.is_ambiguous() {
            return Err(error);
        }

        tracing::warn!(
            client_order_id = %order.client_order_id,
            error = %error,
            "Submission outcome is ambiguous. Reconciling with the venue."
        );
        let status = timeout(
            self.timeouts.broker,
            self.gateway.order_status(&order.symbol, &order.client_order_id),
        )
        .await;
        match status {
            Ok(Ok(Some(order_id))) => {
                tracing::info!(%order_id, "Venue confirmed the order after an ambiguous failure.");
                let mut ack = OrderAck::new(order_id);
                if order.has_protection() {
                    ack.protection_failure =
                        Some("protective legs unverified after ambiguous submission".to_string());
                }
                Ok(ack)
            }
            Ok(Ok(None)) => Err(error),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Reconciliation query failed.");
                Err(error)
            }
            Err(_) => {
                tracing::warn!("Reconciliation query timed out.");
                Err(error)
            }
        }
    }

    async fn record(&self, record: TradeRecord) -> SignalOutcome {
        let order_id = record.order_id.clone();
        let writes = self.sinks.iter().map(|sink| {
            let record = &record;
            let order_id = &order_id;
            async move {
                match timeout(self.timeouts.sink, sink.append(record)).await {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => {
                        tracing::error!(sink = sink.name(), %order_id, error = %e, "Trade record write failed.");
                        Some(sink.name())
                    }
                    Err(_) => {
                        tracing::error!(sink = sink.name(), %order_id, "Trade record write timed out.");
                        Some(sink.name())
                    }
                }
            }
        });
        let failed_sinks: Vec<&'static str> = join_all(writes).await.into_iter().flatten().collect();

        if failed_sinks.is_empty() {
            tracing::info!(%order_id, "Trade recorded.");
            SignalOutcome::Recorded { order_id }
        } else {
            SignalOutcome::RecordPartial { order_id, failed_sinks }
        }
    }
}
