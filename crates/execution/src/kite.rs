// In crates/execution/src/kite.rs

use crate::{BrokerError, OrderAck, OrderGateway, Result};
use api_client::types::KiteOrderParams;
use api_client::KiteClient;
use async_trait::async_trait;
use core_types::{ClientOrderId, Order, OrderId, OrderType, Side, Symbol};
use rust_decimal::Decimal;

/// Kite order tags are limited to 20 characters.
const TAG_LEN: usize = 20;

/// A gateway that routes orders to Zerodha Kite.
///
/// Kite has no server-side bracket for intraday products, so a protective
/// stop is emulated: the entry is placed first, then an `SL-M` order on the
/// opposite side. The two legs are not atomic. If the stop leg fails after
/// the entry was accepted, the failure is carried on the `OrderAck` rather
/// than turned into an error, because the entry itself did go through.
#[derive(Debug, Clone)]
pub struct KiteGateway {
    client: KiteClient,
    exchange: String,
    product: String,
}

impl KiteGateway {
    pub fn new(client: KiteClient, exchange: String, product: String) -> Self {
        Self { client, exchange, product }
    }

    /// The `EXCHANGE:SYMBOL` instrument key Kite quotes by.
    pub fn instrument(&self, symbol: &Symbol) -> String {
        format!("{}:{}", self.exchange, symbol.0.to_uppercase())
    }

    /// The tag used to find the entry order again during reconciliation.
    pub fn entry_tag(client_order_id: &ClientOrderId) -> String {
        client_order_id.truncated(TAG_LEN).to_string()
    }

    fn stop_tag(client_order_id: &ClientOrderId) -> String {
        format!("sl{}", client_order_id.truncated(TAG_LEN - 2))
    }

    fn transaction_type(side: Side) -> &'static str {
        match side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    pub fn entry_params(&self, order: &Order) -> Result<KiteOrderParams> {
        let (order_type, price) = match order.order_type {
            OrderType::Market => ("MARKET", None),
            OrderType::Limit => {
                let price = order.limit_price.ok_or_else(|| BrokerError::InvalidParameters {
                    reason: "limit order without a limit price".to_string(),
                })?;
                ("LIMIT", Some(price))
            }
        };
        Ok(KiteOrderParams {
            tradingsymbol: order.symbol.0.to_uppercase(),
            exchange: self.exchange.clone(),
            transaction_type: Self::transaction_type(order.side),
            order_type,
            quantity: order.quantity,
            product: self.product.clone(),
            validity: "DAY",
            price,
            trigger_price: None,
            tag: Some(Self::entry_tag(&order.client_order_id)),
        })
    }

    pub fn stop_params(&self, order: &Order, stop: Decimal) -> KiteOrderParams {
        KiteOrderParams {
            tradingsymbol: order.symbol.0.to_uppercase(),
            exchange: self.exchange.clone(),
            transaction_type: Self::transaction_type(order.side.opposite()),
            order_type: "SL-M",
            quantity: order.quantity,
            product: self.product.clone(),
            validity: "DAY",
            price: None,
            trigger_price: Some(stop),
            tag: Some(Self::stop_tag(&order.client_order_id)),
        }
    }

    fn classify(err: api_client::Error) -> BrokerError {
        match err {
            api_client::Error::KiteError { status, error_type, message } => {
                match error_type.as_str() {
                    "TokenException" | "PermissionException" => {
                        BrokerError::AuthFailure { reason: message }
                    }
                    "InputException" => BrokerError::InvalidParameters { reason: message },
                    "NetworkException" => BrokerError::UnknownOutcome { reason: message },
                    _ if status >= 500 => BrokerError::UnknownOutcome {
                        reason: format!("{error_type}: {message}"),
                    },
                    _ => BrokerError::RejectedByVenue {
                        reason: format!("{error_type}: {message}"),
                    },
                }
            }
            other => BrokerError::from(other),
        }
    }
}

#[async_trait]
impl OrderGateway for KiteGateway {
    fn name(&self) -> &'static str {
        "KiteGateway"
    }

    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal> {
        self.client
            .last_price(&self.instrument(symbol))
            .await
            .map_err(Self::classify)
    }

    async fn place_order(&self, order: &Order) -> Result<OrderAck> {
        let entry = self.entry_params(order)?;
        let entry_id = self.client.place_order(&entry).await.map_err(Self::classify)?;
        tracing::info!(
            symbol = %order.symbol,
            order_id = %entry_id,
            client_order_id = %order.client_order_id,
            "Kite entry order placed."
        );
        let mut ack = OrderAck::new(OrderId(entry_id));

        // --- Emulated protective stop ---
        if let Some(stop) = order.stop_loss {
            match self.client.place_order(&self.stop_params(order, stop)).await {
                Ok(stop_id) => ack.protective_legs.push(OrderId(stop_id)),
                Err(e) => {
                    tracing::error!(
                        symbol = %order.symbol,
                        order_id = %ack.order_id,
                        error = %e,
                        "Stop-loss leg failed after entry was accepted. Position is unprotected."
                    );
                    ack.protection_failure = Some(format!("stop-loss leg failed: {e}"));
                }
            }
        }
        if order.take_profit.is_some() {
            tracing::warn!(
                symbol = %order.symbol,
                "Kite has no native bracket for this product; take-profit is not placed."
            );
        }
        Ok(ack)
    }

    async fn order_status(
        &self,
        symbol: &Symbol,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<OrderId>> {
        let tag = Self::entry_tag(client_order_id);
        let tradingsymbol = symbol.0.to_uppercase();
        let orders = self.client.orders().await.map_err(Self::classify)?;
        let Some(entry) = orders
            .into_iter()
            .find(|o| o.tag.as_deref() == Some(tag.as_str()) && o.tradingsymbol == tradingsymbol)
        else {
            return Ok(None);
        };
        if matches!(entry.status.as_str(), "REJECTED" | "CANCELLED") {
            tracing::warn!(order_id = %entry.order_id, status = %entry.status, "Venue lists the order but it is not live.");
            return Ok(None);
        }
        Ok(Some(OrderId(entry.order_id)))
    }
}
