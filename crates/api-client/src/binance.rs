// In crates/api-client/src/binance.rs

use crate::types::{BinanceOrderParams, NewOrderResponse, TickerPrice};
use crate::{Error, Result};
use app_config::types::BinanceSettings;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;

// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

/// Binance's "Order does not exist." error code.
const ORDER_DOES_NOT_EXIST: i64 = -2013;

/// The client for the Binance USD-M Futures REST API.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    /// The persistent HTTP client.
    http_client: Client,
    /// The user's Binance API key.
    api_key: String,
    /// The user's Binance secret key.
    secret_key: String,
    /// The base URL for the Binance Futures API.
    base_url: String,
}

impl BinanceClient {
    /// Constructs a new client from `BinanceSettings`.
    pub fn new(settings: &BinanceSettings, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http_client: crate::http_client(timeout)?,
            api_key: settings.api_key.clone(),
            secret_key: settings.secret_key.clone(),
            base_url: settings.rest_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Generates an HMAC-SHA256 signature for a given query string.
    ///
    /// # Returns
    ///
    /// A hexadecimal string representation of the signature.
    fn sign(&self, query_string: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Appends the timestamp and signature to `params`.
    fn create_signed_query(&self, params: &mut String) {
        let timestamp = Utc::now().timestamp_millis();

        if !params.is_empty() {
            params.push('&');
        }
        params.push_str(&format!("timestamp={}", timestamp));

        let signature = self.sign(params);
        params.push_str(&format!("&signature={}", signature));
    }

    /// Fetches the latest traded price.
    ///
    /// This corresponds to the `GET /fapi/v1/ticker/price` endpoint.
    pub async fn ticker_price(&self, symbol: &str) -> Result<Decimal> {
        let url = format!("{}/fapi/v1/ticker/price?symbol={}", self.base_url, symbol);
        let response = self.http_client.get(&url).send().await?;
        let ticker: TickerPrice = serde_json::from_value(Self::into_value(response).await?)?;
        Ok(ticker.price)
    }

    /// Places a new order.
    ///
    /// This corresponds to the `POST /fapi/v1/order` endpoint.
    pub async fn place_order(&self, order: &BinanceOrderParams) -> Result<NewOrderResponse> {
        let mut params = order.to_query();
        self.create_signed_query(&mut params);

        let url = format!("{}/fapi/v1/order", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(params)
            .send()
            .await?;

        let order_response: NewOrderResponse =
            serde_json::from_value(Self::into_value(response).await?)?;
        Ok(order_response)
    }

    /// Looks up an order by the client order id it was submitted with.
    ///
    /// Returns `Ok(None)` when the venue has no such order.
    pub async fn query_order(
        &self,
        symbol: &str,
        client_order_id: &str,
    ) -> Result<Option<NewOrderResponse>> {
        let mut params = format!("symbol={}&origClientOrderId={}", symbol, client_order_id);
        self.create_signed_query(&mut params);

        let url = format!("{}/fapi/v1/order?{}", self.base_url, params);
        let response = self
            .http_client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        match Self::into_value(response).await {
            Ok(value) => Ok(Some(serde_json::from_value(value)?)),
            Err(Error::ApiError { code: ORDER_DOES_NOT_EXIST, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reads the body and turns Binance error objects into `Error::ApiError`.
    async fn into_value(response: Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;

        // Binance returns an error object on failure, so we check for that first.
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            if let Some(code) = value.get("code").and_then(Value::as_i64) {
                if code != 0 && code != 200 {
                    let msg = value
                        .get("msg")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown error")
                        .to_string();
                    return Err(Error::ApiError { status: status.as_u16(), code, msg });
                }
            }
            if status.is_success() {
                return Ok(value);
            }
        }

        if !status.is_success() {
            return Err(Error::Http { status: status.as_u16(), message: text });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    fn client(base_url: &str, secret: &str) -> BinanceClient {
        let settings = BinanceSettings {
            api_key: "key".into(),
            secret_key: secret.into(),
            rest_base_url: base_url.into(),
        };
        BinanceClient::new(&settings, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn signs_the_documented_example() {
        let client = client(
            "http://localhost",
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j",
        );
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            client.sign(query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn renders_protective_leg_query() {
        let params = BinanceOrderParams {
            symbol: "BTCUSDT".into(),
            side: "SELL",
            order_type: "STOP_MARKET",
            quantity: None,
            price: None,
            stop_price: Some(dec!(41000.5)),
            close_position: true,
            client_order_id: Some("abc-sl".into()),
        };
        assert_eq!(
            params.to_query(),
            "symbol=BTCUSDT&side=SELL&type=STOP_MARKET&stopPrice=41000.5&closePosition=true&newClientOrderId=abc-sl"
        );
    }

    #[tokio::test]
    async fn place_order_sends_signed_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/fapi/v1/order")
            .match_header("X-MBX-APIKEY", "key")
            .match_body(Matcher::Regex(
                r"^symbol=BTCUSDT&side=BUY&type=MARKET&quantity=3&newClientOrderId=cid&timestamp=\d+&signature=[0-9a-f]{64}$".into(),
            ))
            .with_status(200)
            .with_body(r#"{"orderId":42,"clientOrderId":"cid","symbol":"BTCUSDT","status":"NEW"}"#)
            .create_async()
            .await;

        let params = BinanceOrderParams {
            symbol: "BTCUSDT".into(),
            side: "BUY",
            order_type: "MARKET",
            quantity: Some(3),
            price: None,
            stop_price: None,
            close_position: false,
            client_order_id: Some("cid".into()),
        };
        let response = client(&server.url(), "secret").place_order(&params).await.unwrap();
        assert_eq!(response.order_id, 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_codes_are_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/fapi/v1/order")
            .with_status(400)
            .with_body(r#"{"code":-2019,"msg":"Margin is insufficient."}"#)
            .create_async()
            .await;

        let params = BinanceOrderParams {
            symbol: "BTCUSDT".into(),
            side: "BUY",
            order_type: "MARKET",
            quantity: Some(1),
            price: None,
            stop_price: None,
            close_position: false,
            client_order_id: None,
        };
        let err = client(&server.url(), "secret").place_order(&params).await.unwrap_err();
        assert!(matches!(err, Error::ApiError { status: 400, code: -2019, .. }));
    }

    #[tokio::test]
    async fn missing_order_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fapi/v1/order")
            .match_query(Matcher::Regex("origClientOrderId=cid".into()))
            .with_status(400)
            .with_body(r#"{"code":-2013,"msg":"Order does not exist."}"#)
            .create_async()
            .await;

        let found = client(&server.url(), "secret").query_order("BTCUSDT", "cid").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn ticker_price_parses_string_price() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fapi/v1/ticker/price")
            .match_query(Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
            .with_body(r#"{"symbol":"BTCUSDT","price":"43250.10","time":1}"#)
            .create_async()
            .await;

        let price = client(&server.url(), "secret").ticker_price("BTCUSDT").await.unwrap();
        assert_eq!(price, dec!(43250.10));
    }
}
