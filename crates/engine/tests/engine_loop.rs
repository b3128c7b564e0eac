// In crates/engine/tests/engine_loop.rs

mod common;

use app_config::{Market, TradingHours};
use common::*;
use core_types::Symbol;
use engine::Engine;
use execution::{OrderGateway, PaperGateway};
use rust_decimal_macros::dec;
use signals::{ChannelSignalSource, SignalSource};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn always_open() -> TradingHours {
    TradingHours { market: Market::Crypto, start: 0.0, end: 24.0 }
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn polled_signals_flow_through_to_the_paper_venue() {
    let paper = Arc::new(PaperGateway::new());
    paper.set_quote(Symbol::from("BTCUSDT"), dec!(50));
    let gateway: Arc<dyn OrderGateway> = paper.clone();

    let sink = Arc::new(MemorySink::default());
    let pipeline = Arc::new(
        pipeline(gateway, Arc::new(FixedAdvisor(plan("BTCUSDT", Some(dec!(48)), Some(dec!(56))))), 5)
            .with_sink(sink.clone()),
    );

    let (tx, source) = ChannelSignalSource::channel(16);
    let sources: Vec<Arc<dyn SignalSource>> = vec![Arc::new(source)];
    let engine = Engine::new(pipeline, sources, always_open(), Duration::from_millis(10), 2);

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { engine.run(shutdown).await }
    });

    tx.send(signal("BTCUSDT", dec!(50))).await.unwrap();
    wait_for(|| sink.records().len() == 1).await;

    shutdown.cancel();
    handle.await.unwrap().unwrap();

    let fills = paper.fills();
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].quantity, 1000);
    assert_eq!(sink.records()[0].order_id, fills[0].order_id);
}

#[tokio::test]
async fn closed_market_is_not_polled() {
    let gateway = Arc::new(ScriptedGateway::new());
    let pipeline = Arc::new(pipeline(gateway.clone(), Arc::new(FixedAdvisor(plan("AAPL", Some(dec!(48)), None))), 5));

    let (tx, source) = ChannelSignalSource::channel(16);
    let closed = TradingHours { market: Market::Crypto, start: 0.0, end: 0.0 };
    let sources: Vec<Arc<dyn SignalSource>> = vec![Arc::new(source)];
    let engine = Engine::new(pipeline, sources, closed, Duration::from_millis(10), 2);

    tx.send(signal("AAPL", dec!(50))).await.unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { engine.run(shutdown).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();
    handle.await.unwrap().unwrap();

    assert!(gateway.placed().is_empty());
}

#[tokio::test]
async fn shutdown_drains_in_flight_signals() {
    let gateway = Arc::new(ScriptedGateway::new().with_delay(Duration::from_millis(150)));
    let sink = Arc::new(MemorySink::default());
    let pipeline = Arc::new(
        pipeline(gateway.clone(), Arc::new(FixedAdvisor(plan("AAPL", Some(dec!(48)), None))), 5)
            .with_sink(sink.clone()),
    );

    let (tx, source) = ChannelSignalSource::channel(16);
    let sources: Vec<Arc<dyn SignalSource>> = vec![Arc::new(source)];
    let engine = Engine::new(pipeline, sources, always_open(), Duration::from_millis(10), 1);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { engine.run(shutdown).await }
    });

    tx.send(signal("AAPL", dec!(50))).await.unwrap();
    wait_for(|| !gateway.placed().is_empty() || gateway.max_in_flight_per_symbol() == 1).await;
    shutdown.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(sink.records().len(), 1);
}

#[tokio::test]
async fn engine_without_sources_refuses_to_run() {
    let gateway = Arc::new(ScriptedGateway::new());
    let pipeline = Arc::new(pipeline(gateway, Arc::new(FixedAdvisor(plan("AAPL", Some(dec!(48)), None))), 5));
    let engine = Engine::new(pipeline, Vec::new(), always_open(), Duration::from_millis(10), 1);

    assert!(engine.run(CancellationToken::new()).await.is_err());
}
