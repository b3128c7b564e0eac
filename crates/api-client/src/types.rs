// In crates/api-client/src/types.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// --- Alpaca ---

/// `POST /v2/orders` request body.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AlpacaOrderRequest {
    pub symbol: String,
    pub qty: String,
    /// "buy" or "sell".
    pub side: &'static str,
    /// "market" or "limit".
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    /// "bracket" when both legs are present, "oto" when only one is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<AlpacaTakeProfit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<AlpacaStopLoss>,
    pub client_order_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AlpacaTakeProfit {
    pub limit_price: Decimal,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AlpacaStopLoss {
    pub stop_price: Decimal,
}

/// An order as returned by the Alpaca trading API.
#[derive(Debug, Deserialize, Clone)]
pub struct AlpacaOrder {
    pub id: String,
    pub client_order_id: String,
    pub status: String,
    #[serde(default)]
    pub legs: Option<Vec<AlpacaOrder>>,
}

/// `GET /v2/stocks/{symbol}/quotes/latest` response.
#[derive(Debug, Deserialize)]
pub struct AlpacaLatestQuote {
    pub quote: AlpacaQuote,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaQuote {
    /// Ask price.
    pub ap: Decimal,
    /// Bid price.
    pub bp: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AlpacaErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

// --- Kite ---

/// Form parameters for `POST /orders/regular`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct KiteOrderParams {
    pub tradingsymbol: String,
    pub exchange: String,
    /// "BUY" or "SELL".
    pub transaction_type: &'static str,
    /// "MARKET", "LIMIT", "SL" or "SL-M".
    pub order_type: &'static str,
    pub quantity: u64,
    pub product: String,
    pub validity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// The `{"status": ..., "data": ...}` envelope every Kite response uses.
#[derive(Debug, Deserialize)]
pub struct KiteEnvelope<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KiteOrderAck {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct KiteLtp {
    pub last_price: Decimal,
}

/// An entry of the `GET /orders` order book.
#[derive(Debug, Deserialize, Clone)]
pub struct KiteOrder {
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub tag: Option<String>,
    pub tradingsymbol: String,
}

// --- Binance USD-M futures ---

/// Parameters for `POST /fapi/v1/order`, rendered into a signed query string.
#[derive(Debug, Clone, PartialEq)]
pub struct BinanceOrderParams {
    pub symbol: String,
    /// "BUY" or "SELL".
    pub side: &'static str,
    /// "MARKET", "LIMIT", "STOP_MARKET" or "TAKE_PROFIT_MARKET".
    pub order_type: &'static str,
    pub quantity: Option<u64>,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub close_position: bool,
    pub client_order_id: Option<String>,
}

impl BinanceOrderParams {
    /// Renders the unsigned query string in a stable parameter order.
    pub fn to_query(&self) -> String {
        let mut params = format!(
            "symbol={}&side={}&type={}",
            self.symbol, self.side, self.order_type
        );
        if let Some(quantity) = self.quantity {
            params.push_str(&format!("&quantity={}", quantity));
        }
        if let Some(price) = self.price {
            params.push_str(&format!("&price={}&timeInForce=GTC", price));
        }
        if let Some(stop_price) = self.stop_price {
            params.push_str(&format!("&stopPrice={}", stop_price));
        }
        if self.close_position {
            params.push_str("&closePosition=true");
        }
        if let Some(id) = &self.client_order_id {
            params.push_str(&format!("&newClientOrderId={}", id));
        }
        params
    }
}

/// The response to a new or queried futures order.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderResponse {
    pub order_id: i64,
    pub client_order_id: String,
    pub symbol: String,
    pub status: String,
}

/// `GET /fapi/v1/ticker/price` response.
#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: Decimal,
}
