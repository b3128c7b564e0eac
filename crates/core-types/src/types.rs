// In crates/core-types/src/types.rs

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A venue-neutral trading symbol (e.g., "AAPL", "INFY", "BTCUSDT").
///
/// Venue-specific formats (such as `NSE:INFY`) are produced by the gateways,
/// never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol(value.to_string())
    }
}

/// The direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[serde(alias = "BUY", alias = "Buy")]
    Buy,
    #[serde(alias = "SELL", alias = "Sell")]
    Sell,
}

impl Side {
    /// The side that closes a position opened on `self`.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
            Side::Sell => f.write_str("sell"),
        }
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(Error::UnknownSide(s.to_string())),
        }
    }
}

/// The analytic family that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Technical,
    Fundamental,
    Sentiment,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Technical => f.write_str("technical"),
            SignalSource::Fundamental => f.write_str("fundamental"),
            SignalSource::Sentiment => f.write_str("sentiment"),
        }
    }
}

impl FromStr for SignalSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "technical" => Ok(SignalSource::Technical),
            "fundamental" => Ok(SignalSource::Fundamental),
            "sentiment" => Ok(SignalSource::Sentiment),
            _ => Err(Error::UnknownSource(s.to_string())),
        }
    }
}

/// A candidate trade idea produced by an analytic source.
///
/// Signals are immutable once produced and are consumed exactly once by the
/// execution pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub symbol: Symbol,
    pub side: Side,
    /// The price at which the source expects to enter. Must be strictly positive.
    pub entry_price: Decimal,
    #[serde(default)]
    pub stop_guess: Option<Decimal>,
    #[serde(default)]
    pub target_guess: Option<Decimal>,
    pub reason: String,
    pub source: SignalSource,
}

impl TradeSignal {
    /// Returns `true` if the signal can enter the pipeline at all.
    pub fn is_well_formed(&self) -> bool {
        !self.symbol.0.trim().is_empty() && self.entry_price > Decimal::ZERO
    }
}

/// A refined trade plan produced by the plan advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub symbol: Symbol,
    pub side: Side,
    pub stop: Option<Decimal>,
    pub target: Option<Decimal>,
    /// Advisor confidence in `[0, 1]`, if it gave one.
    pub confidence: Option<f64>,
    pub reason: String,
}

/// Opaque identifier assigned by a venue to an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Idempotency key attached to an order before it leaves the process.
///
/// Generated exactly once per admitted signal; used to ask a venue whether an
/// order whose submission outcome is unknown actually arrived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(pub String);

impl ClientOrderId {
    /// A fresh 32-character lowercase hex identifier.
    pub fn generate() -> Self {
        ClientOrderId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier cut down to a venue's maximum tag length.
    pub fn truncated(&self, max_len: usize) -> &str {
        let end = self.0.len().min(max_len);
        &self.0[..end]
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// An order ready to be handed to an `OrderGateway`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub symbol: Symbol,
    pub side: Side,
    /// Whole units only; always greater than zero.
    pub quantity: u64,
    pub order_type: OrderType,
    pub limit_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub client_order_id: ClientOrderId,
}

impl Order {
    /// A market order with optional protective legs.
    pub fn market(
        symbol: Symbol,
        side: Side,
        quantity: u64,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Self {
        Self {
            symbol,
            side,
            quantity,
            order_type: OrderType::Market,
            limit_price: None,
            stop_loss,
            take_profit,
            client_order_id: ClientOrderId::generate(),
        }
    }

    /// Returns `true` if the order asks for any protective leg.
    pub fn has_protection(&self) -> bool {
        self.stop_loss.is_some() || self.take_profit.is_some()
    }
}

/// The durable, append-only record of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u64,
    pub entry_price: Decimal,
    pub stop: Option<Decimal>,
    pub target: Option<Decimal>,
    pub reason: String,
    pub order_id: OrderId,
    pub client_order_id: ClientOrderId,
    pub source: SignalSource,
    pub confidence: Option<f64>,
    /// `false` when the venue accepted the entry but a protective leg failed.
    pub protected: bool,
}

impl TradeRecord {
    /// A single-line human-readable rationale, used as retrieval context.
    pub fn rationale(&self) -> String {
        format!(
            "{} {} at {}, SL={}, TP={} -> {}",
            self.side,
            self.symbol,
            self.entry_price,
            display_opt(self.stop),
            display_opt(self.target),
            self.reason
        )
    }
}

fn display_opt(value: Option<Decimal>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}
