// In crates/engine/tests/common/mod.rs

#![allow(dead_code)]

use advisor::PlanAdvisor;
use async_trait::async_trait;
use core_types::{ClientOrderId, Order, OrderId, Side, SignalSource, Symbol, TradePlan, TradeRecord, TradeSignal};
use database::TradeRecordSink;
use engine::{ExecutionPipeline, PipelineTimeouts, PositionBook};
use execution::{BrokerError, OrderAck, OrderGateway};
use risk::{FixedFractionalRiskManager, RiskConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn signal(symbol: &str, entry: Decimal) -> TradeSignal {
    TradeSignal {
        symbol: Symbol::from(symbol),
        side: Side::Buy,
        entry_price: entry,
        stop_guess: None,
        target_guess: None,
        reason: "breakout".into(),
        source: SignalSource::Technical,
    }
}

pub fn plan(symbol: &str, stop: Option<Decimal>, target: Option<Decimal>) -> TradePlan {
    TradePlan {
        symbol: Symbol::from(symbol),
        side: Side::Buy,
        stop,
        target,
        confidence: Some(0.7),
        reason: "advisor agrees".into(),
    }
}

pub fn risk(max_positions: u32) -> Arc<FixedFractionalRiskManager> {
    let config = RiskConfig::new(dec!(0.02), dec!(3.0), max_positions, false).unwrap();
    Arc::new(FixedFractionalRiskManager::new(config))
}

pub fn fast_timeouts() -> PipelineTimeouts {
    PipelineTimeouts {
        context: Duration::from_millis(100),
        advisor: Duration::from_millis(100),
        broker: Duration::from_millis(200),
        sink: Duration::from_millis(100),
    }
}

/// Builds a pipeline with $100,000 equity and the default test limits.
pub fn pipeline(
    gateway: Arc<dyn OrderGateway>,
    primary: Arc<dyn PlanAdvisor>,
    max_positions: u32,
) -> ExecutionPipeline {
    ExecutionPipeline::new(
        risk(max_positions),
        gateway,
        primary,
        Arc::new(PositionBook::new(dec!(100000), max_positions)),
    )
    .with_timeouts(fast_timeouts())
}

// --- Advisors ---

/// Always returns the same plan.
pub struct FixedAdvisor(pub TradePlan);

#[async_trait]
impl PlanAdvisor for FixedAdvisor {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn refine(&self, _signal: &TradeSignal, _context: &str) -> advisor::Result<TradePlan> {
        Ok(self.0.clone())
    }
}

/// Never answers in time.
pub struct StalledAdvisor;

#[async_trait]
impl PlanAdvisor for StalledAdvisor {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn refine(&self, _signal: &TradeSignal, _context: &str) -> advisor::Result<TradePlan> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(advisor::Error::EmptyReply)
    }
}

// --- Gateway ---

/// A venue whose replies are scripted per call.
#[derive(Default)]
pub struct ScriptedGateway {
    placed: Mutex<Vec<Order>>,
    replies: Mutex<VecDeque<Result<OrderAck, BrokerError>>>,
    known: Mutex<HashMap<ClientOrderId, OrderId>>,
    remember_ambiguous: bool,
    delay: Duration,
    in_flight: Mutex<HashMap<Symbol, usize>>,
    max_in_flight: AtomicUsize,
    status_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `place_order` take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queues the reply for the next `place_order`.
    pub fn reply(self, reply: Result<OrderAck, BrokerError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Ambiguous failures still leave the order at the venue.
    pub fn remembering_ambiguous_orders(mut self) -> Self {
        self.remember_ambiguous = true;
        self
    }

    pub fn placed(&self) -> Vec<Order> {
        self.placed.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// The most `place_order` calls ever in flight for a single symbol.
    pub fn max_in_flight_per_symbol(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderGateway for ScriptedGateway {
    fn name(&self) -> &'static str {
        "ScriptedGateway"
    }

    async fn get_price(&self, _symbol: &Symbol) -> execution::Result<Decimal> {
        Ok(dec!(50))
    }

    async fn place_order(&self, order: &Order) -> execution::Result<OrderAck> {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let count = in_flight.entry(order.symbol.clone()).or_default();
            *count += 1;
            self.max_in_flight.fetch_max(*count, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        *self.in_flight.lock().unwrap().entry(order.symbol.clone()).or_default() -= 1;

        let n = {
            let mut placed = self.placed.lock().unwrap();
            placed.push(order.clone());
            placed.len()
        };
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(OrderAck::new(OrderId(format!("ord-{n}")))));

        match &reply {
            Ok(ack) => {
                self.known.lock().unwrap().insert(order.client_order_id.clone(), ack.order_id.clone());
            }
            Err(e) if e.is_ambiguous() && self.remember_ambiguous => {
                self.known
                    .lock()
                    .unwrap()
                    .insert(order.client_order_id.clone(), OrderId(format!("late-{n}")));
            }
            Err(_) => {}
        }
        reply
    }

    async fn order_status(
        &self,
        _symbol: &Symbol,
        client_order_id: &ClientOrderId,
    ) -> execution::Result<Option<OrderId>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.known.lock().unwrap().get(client_order_id).cloned())
    }
}

// --- Sinks ---

#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<TradeRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<TradeRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeRecordSink for MemorySink {
    fn name(&self) -> &'static str {
        "MemorySink"
    }

    async fn append(&self, record: &TradeRecord) -> database::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl TradeRecordSink for FailingSink {
    fn name(&self) -> &'static str {
        "FailingSink"
    }

    async fn append(&self, _record: &TradeRecord) -> database::Result<()> {
        Err(database::Error::Io(std::io::Error::other("disk full")))
    }
}
