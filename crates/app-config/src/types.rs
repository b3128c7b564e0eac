// In crates/app-config/src/types.rs

use crate::{Error, Result};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use risk::types::RiskSettings;
use risk::RiskConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    /// Per-trade risk limits.
    pub risk: RiskSettings,
    /// Polling cadence, concurrency and call timeouts.
    pub pipeline: PipelineSettings,
    /// The market the process trades and its session hours.
    pub market: MarketSettings,
    /// Venue selection and credentials.
    pub broker: BrokerSettings,
    /// The plan advisor endpoints.
    pub advisor: AdvisorSettings,
    #[serde(default)]
    pub signals: SignalSettings,
    pub journal: JournalSettings,
    /// Optional PostgreSQL trade log.
    pub database: Option<DatabaseSettings>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    pub log_level: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PipelineSettings {
    pub poll_interval_secs: f64,
    /// Equity used for sizing until the account is reconciled.
    pub initial_equity: f64,
    #[serde(default = "default_max_concurrent_signals")]
    pub max_concurrent_signals: usize,
    #[serde(default = "default_advisor_timeout")]
    pub advisor_timeout_secs: f64,
    #[serde(default = "default_broker_timeout")]
    pub broker_timeout_secs: f64,
    #[serde(default = "default_sink_timeout")]
    pub sink_timeout_secs: f64,
    #[serde(default = "default_context_timeout")]
    pub context_timeout_secs: f64,
}

/// Upper bound for every interval and timeout in `[pipeline]`: one day.
const MAX_DURATION_SECS: f64 = 86_400.0;

impl PipelineSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn advisor_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.advisor_timeout_secs)
    }

    pub fn broker_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.broker_timeout_secs)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.sink_timeout_secs)
    }

    pub fn context_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.context_timeout_secs)
    }
}

/// The market a process instance trades.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    /// US equities, hours in America/New_York.
    Us,
    /// Indian equities, hours in Asia/Kolkata.
    In,
    /// Crypto venues, hours in UTC and open on weekends.
    Crypto,
}

impl Market {
    pub fn timezone(self) -> Tz {
        match self {
            Market::Us => chrono_tz::America::New_York,
            Market::In => chrono_tz::Asia::Kolkata,
            Market::Crypto => chrono_tz::UTC,
        }
    }

    fn closes_on_weekends(self) -> bool {
        !matches!(self, Market::Crypto)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct MarketSettings {
    pub market: Market,
    /// `(start_hour, end_hour)` in the market's timezone, e.g. `(9.5, 16.0)` for 09:30-16:00.
    #[serde(default = "default_trading_hours")]
    pub trading_hours: (f64, f64),
}

impl MarketSettings {
    pub fn session(&self) -> TradingHours {
        TradingHours {
            market: self.market,
            start: self.trading_hours.0,
            end: self.trading_hours.1,
        }
    }
}

/// The daily trading session of a market.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingHours {
    pub market: Market,
    pub start: f64,
    pub end: f64,
}

impl TradingHours {
    /// Returns `true` if `now` falls inside the session (start inclusive, end exclusive).
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.market.timezone());
        if self.market.closes_on_weekends() && matches!(local.weekday(), Weekday::Sat | Weekday::Sun)
        {
            return false;
        }
        let hour = f64::from(local.hour())
            + f64::from(local.minute()) / 60.0
            + f64::from(local.second()) / 3600.0;
        hour >= self.start && hour < self.end
    }
}

/// The trading venue backing the order gateway.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Alpaca,
    Kite,
    Binance,
    Paper,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BrokerSettings {
    pub venue: Venue,
    pub alpaca: Option<AlpacaSettings>,
    pub kite: Option<KiteSettings>,
    pub binance: Option<BinanceSettings>,
    pub paper: Option<PaperSettings>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AlpacaSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Routes orders to the paper trading endpoint.
    #[serde(default = "default_true")]
    pub paper_trading: bool,
    /// The market data API base URL.
    #[serde(default = "default_alpaca_data_url")]
    pub data_url: String,
    /// Overrides the trading API base URL derived from `paper_trading`.
    pub trading_url: Option<String>,
}

impl AlpacaSettings {
    pub fn trading_base_url(&self) -> String {
        match &self.trading_url {
            Some(url) => url.clone(),
            None if self.paper_trading => "https://paper-api.alpaca.markets".to_string(),
            None => "https://api.alpaca.markets".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct KiteSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_kite_url")]
    pub base_url: String,
    /// The exchange segment orders are routed to (e.g., "NSE").
    #[serde(default = "default_kite_exchange")]
    pub exchange: String,
    /// The Kite product code (e.g., "MIS" for intraday).
    #[serde(default = "default_kite_product")]
    pub product: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BinanceSettings {
    /// The API key for Binance.
    #[serde(default)]
    pub api_key: String,
    /// The secret key for Binance.
    #[serde(default)]
    pub secret_key: String,
    /// The REST API base URL for Binance USD-M futures.
    #[serde(default = "default_binance_url")]
    pub rest_base_url: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PaperSettings {
    /// Static quotes served by the paper venue, keyed by symbol.
    #[serde(default)]
    pub quotes: HashMap<String, f64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AdvisorSettings {
    pub primary: ModelEndpoint,
    /// A degraded alternative consulted once when the primary fails.
    pub fallback: Option<ModelEndpoint>,
}

/// An OpenAI-compatible chat-completions endpoint.
#[derive(Deserialize, Debug, Clone)]
pub struct ModelEndpoint {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SignalSettings {
    /// A JSON-lines file tailed for new signals.
    pub inbox_path: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct JournalSettings {
    /// The JSON-lines trade journal.
    pub path: String,
    /// How many past rationales to return as advisor context.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseSettings {
    /// The connection URL for the PostgreSQL database.
    pub url: String,
}

impl Settings {
    /// Checks everything that must hold before the process may start.
    pub fn validate(&self) -> Result<()> {
        RiskConfig::try_from(&self.risk)?;

        let pipeline = &self.pipeline;
        if !(pipeline.initial_equity > 0.0 && pipeline.initial_equity.is_finite()) {
            return Err(Error::Invalid("pipeline.initial_equity must be positive".into()));
        }
        if pipeline.max_concurrent_signals == 0 {
            return Err(Error::Invalid("pipeline.max_concurrent_signals must be at least 1".into()));
        }
        for (name, secs) in [
            ("poll_interval_secs", pipeline.poll_interval_secs),
            ("advisor_timeout_secs", pipeline.advisor_timeout_secs),
            ("broker_timeout_secs", pipeline.broker_timeout_secs),
            ("sink_timeout_secs", pipeline.sink_timeout_secs),
            ("context_timeout_secs", pipeline.context_timeout_secs),
        ] {
            if !(secs > 0.0 && secs <= MAX_DURATION_SECS) {
                return Err(Error::Invalid(format!(
                    "pipeline.{name} must be in (0, {MAX_DURATION_SECS}], got {secs}"
                )));
            }
        }

        let (start, end) = self.market.trading_hours;
        if !(0.0..=24.0).contains(&start) || !(0.0..=24.0).contains(&end) || start >= end {
            return Err(Error::Invalid(format!(
                "market.trading_hours must satisfy 0 <= start < end <= 24, got ({start}, {end})"
            )));
        }

        self.validate_broker()?;

        if self.advisor.primary.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::MissingCredential { section: "advisor.primary", field: "api_key" });
        }
        Ok(())
    }

    fn validate_broker(&self) -> Result<()> {
        let expected_market = match self.broker.venue {
            Venue::Alpaca => {
                let alpaca = self.broker.alpaca.as_ref().ok_or(Error::MissingCredential {
                    section: "broker.alpaca",
                    field: "api_key",
                })?;
                require("broker.alpaca", "api_key", &alpaca.api_key)?;
                require("broker.alpaca", "api_secret", &alpaca.api_secret)?;
                Some(Market::Us)
            }
            Venue::Kite => {
                let kite = self.broker.kite.as_ref().ok_or(Error::MissingCredential {
                    section: "broker.kite",
                    field: "api_key",
                })?;
                require("broker.kite", "api_key", &kite.api_key)?;
                require("broker.kite", "access_token", &kite.access_token)?;
                Some(Market::In)
            }
            Venue::Binance => {
                let binance = self.broker.binance.as_ref().ok_or(Error::MissingCredential {
                    section: "broker.binance",
                    field: "api_key",
                })?;
                require("broker.binance", "api_key", &binance.api_key)?;
                require("broker.binance", "secret_key", &binance.secret_key)?;
                Some(Market::Crypto)
            }
            Venue::Paper => None,
        };

        match expected_market {
            Some(market) if market != self.market.market => Err(Error::Invalid(format!(
                "venue {:?} trades the {:?} market, but market.market is {:?}",
                self.broker.venue, market, self.market.market
            ))),
            _ => Ok(()),
        }
    }
}

fn require(section: &'static str, field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::MissingCredential { section, field });
    }
    Ok(())
}

/// Helper functions for serde defaults
fn default_true() -> bool { true }
fn default_max_concurrent_signals() -> usize { 4 }
fn default_advisor_timeout() -> f64 { 30.0 }
fn default_broker_timeout() -> f64 { 10.0 }
fn default_sink_timeout() -> f64 { 5.0 }
fn default_context_timeout() -> f64 { 2.0 }
fn default_trading_hours() -> (f64, f64) { (0.0, 24.0) }
fn default_alpaca_data_url() -> String { "https://data.alpaca.markets".to_string() }
fn default_kite_url() -> String { "https://api.kite.trade".to_string() }
fn default_kite_exchange() -> String { "NSE".to_string() }
fn default_kite_product() -> String { "MIS".to_string() }
fn default_binance_url() -> String { "https://fapi.binance.com".to_string() }
fn default_context_limit() -> usize { 5 }
