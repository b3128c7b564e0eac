// In crates/api-client/src/kite.rs

use crate::types::{KiteEnvelope, KiteLtp, KiteOrder, KiteOrderAck, KiteOrderParams};
use crate::{Error, Result};
use app_config::types::KiteSettings;
use reqwest::{Client, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

/// The client for the Zerodha Kite Connect v3 REST API.
#[derive(Debug, Clone)]
pub struct KiteClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    access_token: String,
}

impl KiteClient {
    pub fn new(settings: &KiteSettings, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http_client: crate::http_client(timeout)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            access_token: settings.access_token.clone(),
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Kite-Version", "3")
            .header(
                "Authorization",
                format!("token {}:{}", self.api_key, self.access_token),
            )
    }

    /// Fetches the last traded price of an `EXCHANGE:SYMBOL` instrument.
    ///
    /// This corresponds to the `GET /quote/ltp` endpoint.
    pub async fn last_price(&self, instrument: &str) -> Result<Decimal> {
        let url = format!("{}/quote/ltp", self.base_url);
        let response = self
            .authed(self.http_client.get(&url))
            .query(&[("i", instrument)])
            .send()
            .await?;
        let quotes: HashMap<String, KiteLtp> = Self::parse(response).await?;
        quotes
            .get(instrument)
            .map(|q| q.last_price)
            .ok_or(Error::MissingField("data.last_price"))
    }

    /// Places a regular order and returns the venue's order id.
    ///
    /// This corresponds to the `POST /orders/regular` endpoint.
    pub async fn place_order(&self, params: &KiteOrderParams) -> Result<String> {
        let url = format!("{}/orders/regular", self.base_url);
        let response = self
            .authed(self.http_client.post(&url))
            .form(params)
            .send()
            .await?;
        let ack: KiteOrderAck = Self::parse(response).await?;
        Ok(ack.order_id)
    }

    /// Fetches the day's order book.
    ///
    /// This corresponds to the `GET /orders` endpoint.
    pub async fn orders(&self) -> Result<Vec<KiteOrder>> {
        let url = format!("{}/orders", self.base_url);
        let response = self.authed(self.http_client.get(&url)).send().await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status().as_u16();
        let text = response.text().await?;

        let envelope: KiteEnvelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if status >= 400 => {
                return Err(Error::Http { status, message: text });
            }
            Err(e) => return Err(Error::DeserializationFailed(e)),
        };

        if envelope.status != "success" || status >= 400 {
            return Err(Error::KiteError {
                status,
                error_type: envelope.error_type.unwrap_or_else(|| "GeneralException".into()),
                message: envelope.message.unwrap_or_default(),
            });
        }
        envelope.data.ok_or(Error::MissingField("data"))
    }
}
