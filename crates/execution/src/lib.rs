// In crates/execution/src/lib.rs

use app_config::types::BrokerSettings;
use app_config::Venue;
use async_trait::async_trait;
use core_types::{ClientOrderId, Order, OrderId, Symbol};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

pub mod alpaca;
pub mod binance;
pub mod error;
pub mod kite;
pub mod paper;

// Re-export public types
pub use error::{BrokerError, Result};
pub use paper::PaperGateway;

/// What a venue reports back for an accepted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    /// The venue's id for the primary (entry) order.
    pub order_id: OrderId,
    /// Ids of protective legs placed as separate orders, if any.
    pub protective_legs: Vec<OrderId>,
    /// Set when the entry was accepted but an emulated protective leg was not.
    pub protection_failure: Option<String>,
}

impl OrderAck {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            protective_legs: Vec::new(),
            protection_failure: None,
        }
    }

    /// `false` means the position is open without the protection that was asked for.
    pub fn is_protected(&self) -> bool {
        self.protection_failure.is_none()
    }
}

/// The universal interface for a trading venue.
///
/// An `OrderGateway` owns everything venue-specific: authentication, symbol
/// formats, and how protective stops are expressed. Submission is treated as
/// non-idempotent: implementations never resubmit on their own, and report
/// ambiguous outcomes distinctly from definite rejections (see
/// [`BrokerError::is_ambiguous`]).
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// The name of the gateway (e.g., "AlpacaGateway").
    fn name(&self) -> &'static str;

    /// The current price of `symbol` at this venue.
    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal>;

    /// Submits an order, together with any protective legs it asks for.
    ///
    /// On success, capital has been committed at the venue.
    async fn place_order(&self, order: &Order) -> Result<OrderAck>;

    /// Asks the venue whether an order with `client_order_id` exists and is
    /// still live or filled. Orders the venue rejected, cancelled or expired
    /// report `None`, since no capital stands behind them.
    ///
    /// Used to reconcile after an ambiguous `place_order` failure.
    async fn order_status(
        &self,
        symbol: &Symbol,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<OrderId>>;
}

/// Instantiates the gateway for the configured venue.
pub fn gateway_from_settings(
    settings: &BrokerSettings,
    timeout: Duration,
) -> Result<Arc<dyn OrderGateway>> {
    let missing = |section: &str| BrokerError::InvalidParameters {
        reason: format!("broker.{section} settings are missing"),
    };
    let gateway: Arc<dyn OrderGateway> = match settings.venue {
        Venue::Alpaca => {
            let alpaca = settings.alpaca.as_ref().ok_or_else(|| missing("alpaca"))?;
            Arc::new(alpaca::AlpacaGateway::new(api_client::AlpacaClient::new(alpaca, timeout)?))
        }
        Venue::Kite => {
            let kite = settings.kite.as_ref().ok_or_else(|| missing("kite"))?;
            Arc::new(kite::KiteGateway::new(
                api_client::KiteClient::new(kite, timeout)?,
                kite.exchange.clone(),
                kite.product.clone(),
            ))
        }
        Venue::Binance => {
            let binance = settings.binance.as_ref().ok_or_else(|| missing("binance"))?;
            Arc::new(binance::BinanceGateway::new(api_client::BinanceClient::new(
                binance, timeout,
            )?))
        }
        Venue::Paper => Arc::new(PaperGateway::from_settings(
            &settings.paper.clone().unwrap_or_default(),
        )),
    };
    tracing::info!(gateway = gateway.name(), "Order gateway selected.");
    Ok(gateway)
}
