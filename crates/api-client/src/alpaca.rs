// In crates/api-client/src/alpaca.rs

use crate::types::{AlpacaErrorBody, AlpacaLatestQuote, AlpacaOrder, AlpacaOrderRequest};
use crate::{Error, Result};
use app_config::types::AlpacaSettings;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// The client for the Alpaca trading and market data APIs.
#[derive(Debug, Clone)]
pub struct AlpacaClient {
    http_client: Client,
    trading_url: String,
    data_url: String,
    api_key: String,
    api_secret: String,
}

impl AlpacaClient {
    pub fn new(settings: &AlpacaSettings, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http_client: crate::http_client(timeout)?,
            trading_url: settings.trading_base_url().trim_end_matches('/').to_string(),
            data_url: settings.data_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
    }

    /// Fetches the latest quote and returns the ask, or the bid when no ask is posted.
    ///
    /// This corresponds to the `GET /v2/stocks/{symbol}/quotes/latest` endpoint.
    pub async fn latest_price(&self, symbol: &str) -> Result<Decimal> {
        let url = format!("{}/v2/stocks/{}/quotes/latest", self.data_url, symbol);
        let response = self.authed(self.http_client.get(&url)).send().await?;
        let latest: AlpacaLatestQuote = Self::parse(response).await?;

        let quote = latest.quote;
        if quote.ap > Decimal::ZERO {
            Ok(quote.ap)
        } else if quote.bp > Decimal::ZERO {
            Ok(quote.bp)
        } else {
            Err(Error::MissingField("quote.ap"))
        }
    }

    /// Submits an order, including any bracket or OTO legs.
    ///
    /// This corresponds to the `POST /v2/orders` endpoint.
    pub async fn submit_order(&self, order: &AlpacaOrderRequest) -> Result<AlpacaOrder> {
        let url = format!("{}/v2/orders", self.trading_url);
        let response = self
            .authed(self.http_client.post(&url))
            .json(order)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Looks up an order by its client order id. Returns `Ok(None)` on 404.
    pub async fn order_by_client_id(&self, client_order_id: &str) -> Result<Option<AlpacaOrder>> {
        let url = format!("{}/v2/orders:by_client_order_id", self.trading_url);
        let response = self
            .authed(self.http_client.get(&url))
            .query(&[("client_order_id", client_order_id)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::parse(response).await.map(Some)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<AlpacaErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            return Err(Error::Http { status: status.as_u16(), message });
        }
        Ok(serde_json::from_str(&text)?)
    }
}
