// In crates/engine/tests/pipeline.rs

mod common;

use advisor::PlanAdvisor;
use async_trait::async_trait;
use common::*;
use core_types::{OrderId, Symbol, TradePlan, TradeSignal};
use engine::SignalOutcome;
use execution::{BrokerError, OrderAck};
use mockall::mock;
use risk::RejectionReason;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Advisor {}

    #[async_trait]
    impl PlanAdvisor for Advisor {
        fn name(&self) -> &'static str;
        async fn refine(&self, signal: &TradeSignal, context: &str) -> advisor::Result<TradePlan>;
    }
}

fn fixed(stop: rust_decimal::Decimal, target: Option<rust_decimal::Decimal>) -> Arc<FixedAdvisor> {
    Arc::new(FixedAdvisor(plan("AAPL", Some(stop), target)))
}

#[tokio::test]
async fn admitted_trade_is_sized_submitted_and_recorded() {
    let gateway = Arc::new(ScriptedGateway::new());
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(gateway.clone(), fixed(dec!(48), Some(dec!(56))), 5).with_sink(sink.clone());

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert_eq!(outcome, SignalOutcome::Recorded { order_id: OrderId("ord-1".into()) });
    let placed = gateway.placed();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].quantity, 1000);
    assert_eq!(placed[0].stop_loss, Some(dec!(48)));
    assert_eq!(placed[0].take_profit, Some(dec!(56)));

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].quantity, 1000);
    assert_eq!(records[0].entry_price, dec!(50));
    assert_eq!(records[0].client_order_id, placed[0].client_order_id);
    assert!(records[0].protected);
    assert_eq!(pipeline.book().open_positions(), 1);
}

#[tokio::test]
async fn low_reward_ratio_never_reaches_the_venue() {
    let gateway = Arc::new(ScriptedGateway::new());
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(gateway.clone(), fixed(dec!(48), Some(dec!(54))), 5).with_sink(sink.clone());

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert_eq!(outcome, SignalOutcome::rejected(RejectionReason::RewardRatioTooLow));
    assert!(gateway.placed().is_empty());
    assert!(sink.records().is_empty());
    assert_eq!(pipeline.book().open_positions(), 0);
}

#[tokio::test]
async fn plan_with_stop_above_entry_is_invalid() {
    let gateway = Arc::new(ScriptedGateway::new());
    let pipeline = pipeline(gateway.clone(), fixed(dec!(52), Some(dec!(60))), 5);

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert_eq!(outcome, SignalOutcome::rejected(RejectionReason::InvalidPlan));
    assert!(gateway.placed().is_empty());
}

#[tokio::test]
async fn malformed_signal_is_rejected_before_any_advisor_call() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut primary = MockAdvisor::new();
    primary.expect_name().return_const("primary");
    primary.expect_refine().never();
    let pipeline = pipeline(gateway.clone(), Arc::new(primary), 5);

    let outcome = pipeline.process(signal("AAPL", dec!(0))).await;

    assert_eq!(outcome, SignalOutcome::rejected(RejectionReason::InvalidSignal));
    assert!(gateway.placed().is_empty());
}

#[tokio::test]
async fn stop_equal_to_entry_is_an_invalid_stop() {
    let gateway = Arc::new(ScriptedGateway::new());
    let pipeline = pipeline(gateway.clone(), fixed(dec!(50), None), 5);

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert_eq!(outcome, SignalOutcome::rejected(RejectionReason::InvalidStop));
}

#[tokio::test]
async fn both_advisors_timing_out_drops_the_signal() {
    let gateway = Arc::new(ScriptedGateway::new());
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(gateway.clone(), Arc::new(StalledAdvisor), 5)
        .with_fallback(Arc::new(StalledAdvisor))
        .with_sink(sink.clone());

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert_eq!(outcome, SignalOutcome::PlanUnavailable);
    assert!(gateway.placed().is_empty());
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn fallback_advisor_is_consulted_once_when_primary_fails() {
    let mut primary = MockAdvisor::new();
    primary.expect_name().return_const("primary");
    primary
        .expect_refine()
        .times(1)
        .returning(|_, _| Err(advisor::Error::EmptyReply));

    let mut fallback = MockAdvisor::new();
    fallback.expect_name().return_const("fallback");
    fallback
        .expect_refine()
        .times(1)
        .returning(|_, _| Ok(plan("AAPL", Some(dec!(48)), Some(dec!(56)))));

    let gateway = Arc::new(ScriptedGateway::new());
    let pipeline = pipeline(gateway.clone(), Arc::new(primary), 5).with_fallback(Arc::new(fallback));

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert!(matches!(outcome, SignalOutcome::Recorded { .. }));
    assert_eq!(gateway.placed().len(), 1);
}

#[tokio::test]
async fn advisor_receives_the_signal_and_retrieved_context() {
    let mut primary = MockAdvisor::new();
    primary.expect_name().return_const("primary");
    primary
        .expect_refine()
        .withf(|signal, context| signal.symbol == Symbol::from("AAPL") && context.is_empty())
        .times(1)
        .returning(|_, _| Ok(plan("AAPL", Some(dec!(48)), None)));

    let gateway = Arc::new(ScriptedGateway::new());
    let outcome = pipeline(gateway, Arc::new(primary), 5)
        .process(signal("AAPL", dec!(50)))
        .await;

    assert!(outcome.order_id().is_some());
}

#[tokio::test]
async fn one_failing_sink_does_not_stop_the_others() {
    let gateway = Arc::new(ScriptedGateway::new());
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(gateway, fixed(dec!(48), Some(dec!(56))), 5)
        .with_sink(Arc::new(FailingSink))
        .with_sink(sink.clone());

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert_eq!(
        outcome,
        SignalOutcome::RecordPartial {
            order_id: OrderId("ord-1".into()),
            failed_sinks: vec!["FailingSink"],
        }
    );
    assert_eq!(sink.records().len(), 1);
}

#[tokio::test]
async fn definite_broker_error_rejects_without_reconciliation() {
    let gateway = Arc::new(ScriptedGateway::new().reply(Err(BrokerError::RejectedByVenue {
        reason: "insufficient buying power".into(),
    })));
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(gateway.clone(), fixed(dec!(48), None), 5).with_sink(sink.clone());

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert!(matches!(
        outcome,
        SignalOutcome::Rejected {
            reason: RejectionReason::BrokerError,
            broker_error: Some(BrokerError::RejectedByVenue { .. }),
        }
    ));
    assert_eq!(gateway.placed().len(), 1);
    assert_eq!(gateway.status_calls(), 0);
    assert!(sink.records().is_empty());
    assert_eq!(pipeline.book().open_positions(), 0);
}

#[tokio::test]
async fn ambiguous_failure_is_recorded_when_the_venue_knows_the_order() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(Err(BrokerError::UnknownOutcome { reason: "HTTP 502".into() }))
            .remembering_ambiguous_orders(),
    );
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(gateway.clone(), fixed(dec!(48), Some(dec!(56))), 5).with_sink(sink.clone());

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert_eq!(outcome, SignalOutcome::Recorded { order_id: OrderId("late-1".into()) });
    assert_eq!(gateway.placed().len(), 1);
    assert_eq!(gateway.status_calls(), 1);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].protected);
    assert_eq!(pipeline.book().open_positions(), 1);
}

#[tokio::test]
async fn ambiguous_failure_is_rejected_when_the_venue_has_no_order() {
    let gateway = Arc::new(
        ScriptedGateway::new().reply(Err(BrokerError::Timeout { detail: "read timed out".into() })),
    );
    let pipeline = pipeline(gateway.clone(), fixed(dec!(48), None), 5);

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert!(matches!(
        outcome,
        SignalOutcome::Rejected { broker_error: Some(BrokerError::Timeout { .. }), .. }
    ));
    assert_eq!(gateway.placed().len(), 1);
    assert_eq!(gateway.status_calls(), 1);
    assert_eq!(pipeline.book().open_positions(), 0);
}

#[tokio::test]
async fn failed_protective_leg_is_recorded_as_unprotected() {
    let mut ack = OrderAck::new(OrderId("entry-1".into()));
    ack.protection_failure = Some("stop-loss leg failed".into());
    let gateway = Arc::new(ScriptedGateway::new().reply(Ok(ack)));
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(gateway, fixed(dec!(48), None), 5).with_sink(sink.clone());

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert_eq!(outcome, SignalOutcome::Recorded { order_id: OrderId("entry-1".into()) });
    assert!(!sink.records()[0].protected);
}

#[tokio::test]
async fn protective_leg_ids_stay_off_the_record() {
    let mut ack = OrderAck::new(OrderId("entry-2".into()));
    ack.protective_legs = vec![OrderId("entry-2-sl".into()), OrderId("entry-2-tp".into())];
    let gateway = Arc::new(ScriptedGateway::new().reply(Ok(ack)));
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(gateway, fixed(dec!(48), Some(dec!(56))), 5).with_sink(sink.clone());

    let outcome = pipeline.process(signal("AAPL", dec!(50))).await;

    assert_eq!(outcome, SignalOutcome::Recorded { order_id: OrderId("entry-2".into()) });
    let records = sink.records();
    assert_eq!(records[0].order_id, OrderId("entry-2".into()));
    assert!(records[0].protected);
}

#[tokio::test]
async fn position_limit_holds_across_symbols() {
    let gateway = Arc::new(ScriptedGateway::new());
    let pipeline = pipeline(gateway.clone(), Arc::new(SymbolEcho), 1);

    let first = pipeline.process(signal("AAPL", dec!(50))).await;
    let second = pipeline.process(signal("MSFT", dec!(50))).await;

    assert!(first.order_id().is_some());
    assert_eq!(second, SignalOutcome::rejected(RejectionReason::MaxPositionsReached));
    assert_eq!(gateway.placed().len(), 1);
}

#[tokio::test]
async fn submissions_for_one_symbol_never_overlap() {
    let gateway = Arc::new(ScriptedGateway::new().with_delay(Duration::from_millis(20)));
    let pipeline = Arc::new(pipeline(gateway.clone(), Arc::new(SymbolEcho), 20));

    let mut handles = Vec::new();
    for symbol in ["AAPL", "AAPL", "AAPL", "MSFT", "MSFT", "AAPL"] {
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::spawn(async move { pipeline.process(signal(symbol, dec!(50))).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().order_id().is_some());
    }

    assert_eq!(gateway.placed().len(), 6);
    assert_eq!(gateway.max_in_flight_per_symbol(), 1);
}

#[tokio::test]
async fn concurrent_signals_respect_the_position_limit_exactly() {
    let gateway = Arc::new(ScriptedGateway::new().with_delay(Duration::from_millis(10)));
    let pipeline = Arc::new(pipeline(gateway.clone(), Arc::new(SymbolEcho), 3));

    let mut handles = Vec::new();
    for symbol in ["A", "B", "C", "D", "E", "F", "G", "H"] {
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::spawn(async move { pipeline.process(signal(symbol, dec!(50))).await }));
    }
    let mut submitted = 0;
    for handle in handles {
        if handle.await.unwrap().order_id().is_some() {
            submitted += 1;
        }
    }

    assert_eq!(submitted, 3);
    assert_eq!(gateway.placed().len(), 3);
    assert_eq!(pipeline.book().open_positions(), 3);
}

/// Echoes the signal's symbol back with a fixed 48/56 plan.
struct SymbolEcho;

#[async_trait]
impl PlanAdvisor for SymbolEcho {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn refine(&self, signal: &TradeSignal, _context: &str) -> advisor::Result<TradePlan> {
        Ok(plan(signal.symbol.as_str(), Some(dec!(48)), Some(dec!(56))))
    }
}
