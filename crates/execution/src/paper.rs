// In crates/execution/src/paper.rs

use crate::{BrokerError, OrderAck, OrderGateway, Result};
use app_config::types::PaperSettings;
use async_trait::async_trait;
use core_types::{ClientOrderId, Order, OrderId, OrderType, Side, Symbol};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A fill recorded by the paper venue.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperFill {
    pub order_id: OrderId,
    pub client_order_id: ClientOrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u64,
    pub price: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

fn key(symbol: &Symbol) -> Symbol {
    Symbol(symbol.0.to_uppercase())
}

#[derive(Debug, Default)]
struct Book {
    quotes: HashMap<Symbol, Decimal>,
    fills: Vec<PaperFill>,
    by_client_id: HashMap<ClientOrderId, OrderId>,
}

/// An in-process venue that fills every order immediately at its quote.
///
/// Quotes come from configuration and can be moved with [`PaperGateway::set_quote`].
/// Protective legs are accepted natively, so a paper fill is always protected.
#[derive(Debug, Default)]
pub struct PaperGateway {
    book: Mutex<Book>,
    next_id: AtomicU64,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &PaperSettings) -> Self {
        let gateway = Self::new();
        for (symbol, price) in &settings.quotes {
            match Decimal::from_f64(*price) {
                Some(price) => gateway.set_quote(Symbol::from(symbol.as_str()), price),
                None => tracing::warn!(%symbol, price, "Ignoring unrepresentable paper quote."),
            }
        }
        gateway
    }

    fn book(&self) -> std::sync::MutexGuard<'_, Book> {
        // A poisoned book only means another thread panicked mid-update; the data is still usable.
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_quote(&self, symbol: Symbol, price: Decimal) {
        self.book().quotes.insert(key(&symbol), price);
    }

    /// Every fill so far, oldest first.
    pub fn fills(&self) -> Vec<PaperFill> {
        self.book().fills.clone()
    }

    fn quote(&self, symbol: &Symbol) -> Result<Decimal> {
        self.book()
            .quotes
            .get(&key(symbol))
            .copied()
            .ok_or_else(|| BrokerError::RejectedByVenue {
                reason: format!("no paper quote for {symbol}"),
            })
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    fn name(&self) -> &'static str {
        "PaperGateway"
    }

    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal> {
        self.quote(symbol)
    }

    async fn place_order(&self, order: &Order) -> Result<OrderAck> {
        if order.quantity == 0 {
            return Err(BrokerError::InvalidParameters {
                reason: "quantity must be positive".to_string(),
            });
        }
        let price = match order.order_type {
            OrderType::Market => self.quote(&order.symbol)?,
            OrderType::Limit => order.limit_price.ok_or_else(|| BrokerError::InvalidParameters {
                reason: "limit order without a limit price".to_string(),
            })?,
        };

        let mut book = self.book();
        if book.by_client_id.contains_key(&order.client_order_id) {
            return Err(BrokerError::RejectedByVenue {
                reason: format!("duplicate client order id {}", order.client_order_id),
            });
        }
        let order_id = OrderId(format!("paper-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1));
        book.by_client_id.insert(order.client_order_id.clone(), order_id.clone());
        book.fills.push(PaperFill {
            order_id: order_id.clone(),
            client_order_id: order.client_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price,
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
        });
        tracing::info!(symbol = %order.symbol, %order_id, %price, quantity = order.quantity, "Paper fill.");
        Ok(OrderAck::new(order_id))
    }

    async fn order_status(
        &self,
        _symbol: &Symbol,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<OrderId>> {
        Ok(self.book().by_client_id.get(client_order_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gateway() -> PaperGateway {
        let mut quotes = HashMap::new();
        quotes.insert("aapl".to_string(), 50.0);
        PaperGateway::from_settings(&PaperSettings { quotes })
    }

    #[tokio::test]
    async fn fills_market_orders_at_the_quote() {
        let gateway = gateway();
        assert_eq!(gateway.get_price(&Symbol::from("AAPL")).await.unwrap(), dec!(50));

        let order = Order::market(Symbol::from("AAPL"), Side::Buy, 10, Some(dec!(48)), None);
        let ack = gateway.place_order(&order).await.unwrap();
        assert_eq!(ack.order_id, OrderId("paper-1".into()));
        assert!(ack.is_protected());

        let fills = gateway.fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, dec!(50));
        assert_eq!(fills[0].stop_loss, Some(dec!(48)));
    }

    #[tokio::test]
    async fn unknown_symbol_is_rejected() {
        let gateway = gateway();
        let order = Order::market(Symbol::from("MSFT"), Side::Buy, 1, None, None);
        let err = gateway.place_order(&order).await.unwrap_err();
        assert!(matches!(err, BrokerError::RejectedByVenue { .. }));
        assert!(gateway.fills().is_empty());
    }

    #[tokio::test]
    async fn duplicate_client_order_id_is_not_filled_twice() {
        let gateway = gateway();
        let order = Order::market(Symbol::from("AAPL"), Side::Sell, 5, None, None);
        gateway.place_order(&order).await.unwrap();
        assert!(gateway.place_order(&order).await.is_err());
        assert_eq!(gateway.fills().len(), 1);

        let found = gateway
            .order_status(&order.symbol, &order.client_order_id)
            .await
            .unwrap();
        assert_eq!(found, Some(OrderId("paper-1".into())));
    }
}
