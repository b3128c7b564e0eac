// In crates/execution/src/alpaca.rs

use crate::{BrokerError, OrderAck, OrderGateway, Result};
use api_client::types::{AlpacaOrderRequest, AlpacaStopLoss, AlpacaTakeProfit};
use api_client::AlpacaClient;
use async_trait::async_trait;
use core_types::{ClientOrderId, Order, OrderId, OrderType, Side, Symbol};
use rust_decimal::Decimal;

/// A gateway that routes orders to Alpaca.
///
/// Alpaca supports protective legs natively, so a stop and a target become a
/// single `bracket` order and a lone stop or target becomes an `oto` order.
/// There is no partial-failure window between legs on this venue.
#[derive(Debug, Clone)]
pub struct AlpacaGateway {
    client: AlpacaClient,
}

impl AlpacaGateway {
    pub fn new(client: AlpacaClient) -> Self {
        Self { client }
    }

    /// Translates a venue-neutral order into Alpaca's request body.
    pub fn build_request(order: &Order) -> Result<AlpacaOrderRequest> {
        let limit_price = match order.order_type {
            OrderType::Market => None,
            OrderType::Limit => Some(order.limit_price.ok_or_else(|| {
                BrokerError::InvalidParameters {
                    reason: "limit order without a limit price".to_string(),
                }
            })?),
        };
        let order_class = match (order.stop_loss, order.take_profit) {
            (Some(_), Some(_)) => Some("bracket"),
            (Some(_), None) | (None, Some(_)) => Some("oto"),
            (None, None) => None,
        };

        Ok(AlpacaOrderRequest {
            symbol: order.symbol.0.to_uppercase(),
            qty: order.quantity.to_string(),
            side: match order.side {
                Side::Buy => "buy",
                Side::Sell => "sell",
            },
            order_type: match order.order_type {
                OrderType::Market => "market",
                OrderType::Limit => "limit",
            },
            time_in_force: "day",
            limit_price,
            order_class,
            take_profit: order.take_profit.map(|limit_price| AlpacaTakeProfit { limit_price }),
            stop_loss: order.stop_loss.map(|stop_price| AlpacaStopLoss { stop_price }),
            client_order_id: order.client_order_id.0.clone(),
        })
    }

    fn classify(err: api_client::Error) -> BrokerError {
        match err {
            api_client::Error::Http { status: 422, message } => {
                BrokerError::InvalidParameters { reason: message }
            }
            other => BrokerError::from(other),
        }
    }
}

#[async_trait]
impl OrderGateway for AlpacaGateway {
    fn name(&self) -> &'static str {
        "AlpacaGateway"
    }

    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal> {
        self.client
            .latest_price(&symbol.0.to_uppercase())
            .await
            .map_err(Self::classify)
    }

    async fn place_order(&self, order: &Order) -> Result<OrderAck> {
        let request = Self::build_request(order)?;
        tracing::info!(
            symbol = %request.symbol,
            qty = %request.qty,
            order_class = ?request.order_class,
            client_order_id = %request.client_order_id,
            "Submitting Alpaca order."
        );

        let response = self.client.submit_order(&request).await.map_err(Self::classify)?;

        let mut ack = OrderAck::new(OrderId(response.id));
        ack.protective_legs = response
            .legs
            .unwrap_or_default()
            .into_iter()
            .map(|leg| OrderId(leg.id))
            .collect();
        Ok(ack)
    }

    async fn order_status(
        &self,
        _symbol: &Symbol,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<OrderId>> {
        let found = self
            .client
            .order_by_client_id(client_order_id.as_str())
            .await
            .map_err(Self::classify)?;
        Ok(found
            .filter(|order| {
                let dead = matches!(order.status.as_str(), "rejected" | "canceled" | "expired");
                if dead {
                    tracing::warn!(order_id = %order.id, status = %order.status, "Venue lists the order but it is not live.");
                }
                !dead
            })
            .map(|order| OrderId(order.id)))
    }
}
