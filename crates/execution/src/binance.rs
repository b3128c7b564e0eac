// In crates/execution/src/binance.rs

use crate::{BrokerError, OrderAck, OrderGateway, Result};
use api_client::types::BinanceOrderParams;
use api_client::BinanceClient;
use async_trait::async_trait;
use core_types::{ClientOrderId, Order, OrderId, OrderType, Side, Symbol};
use rust_decimal::Decimal;

/// A gateway that routes orders to Binance USD-M futures.
///
/// Protective legs are separate `closePosition` orders placed after the
/// entry: a `STOP_MARKET` for the stop and a `TAKE_PROFIT_MARKET` for the
/// target. A leg that fails leaves the entry in place and is reported on
/// the returned `OrderAck`.
#[derive(Debug, Clone)]
pub struct BinanceGateway {
    client: BinanceClient,
}

impl BinanceGateway {
    pub fn new(client: BinanceClient) -> Self {
        Self { client }
    }

    fn side(side: Side) -> &'static str {
        match side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    pub fn entry_params(order: &Order) -> Result<BinanceOrderParams> {
        let (order_type, price) = match order.order_type {
            OrderType::Market => ("MARKET", None),
            OrderType::Limit => {
                let price = order.limit_price.ok_or_else(|| BrokerError::InvalidParameters {
                    reason: "limit order without a limit price".to_string(),
                })?;
                ("LIMIT", Some(price))
            }
        };
        Ok(BinanceOrderParams {
            symbol: order.symbol.0.to_uppercase(),
            side: Self::side(order.side),
            order_type,
            quantity: Some(order.quantity),
            price,
            stop_price: None,
            close_position: false,
            client_order_id: Some(order.client_order_id.0.clone()),
        })
    }

    /// A `closePosition` leg on the opposite side of the entry.
    pub fn leg_params(
        order: &Order,
        order_type: &'static str,
        trigger: Decimal,
        suffix: &str,
    ) -> BinanceOrderParams {
        BinanceOrderParams {
            symbol: order.symbol.0.to_uppercase(),
            side: Self::side(order.side.opposite()),
            order_type,
            quantity: None,
            price: None,
            stop_price: Some(trigger),
            close_position: true,
            client_order_id: Some(format!("{}-{}", order.client_order_id, suffix)),
        }
    }

    fn classify(err: api_client::Error) -> BrokerError {
        match err {
            api_client::Error::ApiError { status, code, msg } => match code {
                -2014 | -2015 | -1022 => BrokerError::AuthFailure { reason: msg },
                -1199..=-1100 => BrokerError::InvalidParameters { reason: msg },
                -1007 => BrokerError::UnknownOutcome { reason: msg },
                _ if status >= 500 => BrokerError::UnknownOutcome {
                    reason: format!("code {code}: {msg}"),
                },
                _ => BrokerError::RejectedByVenue {
                    reason: format!("code {code}: {msg}"),
                },
            },
            other => BrokerError::from(other),
        }
    }
}

#[async_trait]
impl OrderGateway for BinanceGateway {
    fn name(&self) -> &'static str {
        "BinanceGateway"
    }

    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal> {
        self.client
            .ticker_price(&symbol.0.to_uppercase())
            .await
            .map_err(Self::classify)
    }

    async fn place_order(&self, order: &Order) -> Result<OrderAck> {
        let response = self
            .client
            .place_order(&Self::entry_params(order)?)
            .await
            .map_err(Self::classify)?;
        tracing::info!(
            symbol = %order.symbol,
            order_id = response.order_id,
            status = %response.status,
            "Binance entry order placed."
        );
        let mut ack = OrderAck::new(OrderId(response.order_id.to_string()));

        // --- Protective legs ---
        let legs = [
            (order.stop_loss, "STOP_MARKET", "sl"),
            (order.take_profit, "TAKE_PROFIT_MARKET", "tp"),
        ];
        let mut failures = Vec::new();
        for (trigger, order_type, suffix) in legs {
            let Some(trigger) = trigger else { continue };
            let params = Self::leg_params(order, order_type, trigger, suffix);
            match self.client.place_order(&params).await {
                Ok(leg) => ack.protective_legs.push(OrderId(leg.order_id.to_string())),
                Err(e) => {
                    tracing::error!(
                        symbol = %order.symbol,
                        order_id = %ack.order_id,
                        leg = order_type,
                        error = %e,
                        "Protective leg failed after entry was accepted."
                    );
                    failures.push(format!("{order_type} leg failed: {e}"));
                }
            }
        }
        if !failures.is_empty() {
            ack.protection_failure = Some(failures.join("; "));
        }
        Ok(ack)
    }

    async fn order_status(
        &self,
        symbol: &Symbol,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<OrderId>> {
        let found = self
            .client
            .query_order(&symbol.0.to_uppercase(), client_order_id.as_str())
            .await
            .map_err(Self::classify)?;
        Ok(found
            .filter(|o| {
                let dead = matches!(
                    o.status.as_str(),
                    "REJECTED" | "CANCELED" | "EXPIRED" | "EXPIRED_IN_MATCH"
                );
                if dead {
                    tracing::warn!(order_id = o.order_id, status = %o.status, "Venue lists the order but it is not live.");
                }
                !dead
            })
            .map(|o| OrderId(o.order_id.to_string())))
    }
}
