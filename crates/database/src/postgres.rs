// In crates/database/src/postgres.rs

use crate::{mentions, ContextSource, Error, Result, TradeRecordSink};
use app_config::types::DatabaseSettings;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use core_types::{ClientOrderId, OrderId, Symbol, TradeRecord};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::str::FromStr;

/// A wrapper around the `sqlx` connection pool.
#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
    context_limit: i64,
}

/// Establishes a connection pool to the PostgreSQL database and runs migrations.
///
/// # Arguments
///
/// * `settings`: The database configuration settings.
/// * `context_limit`: How many past rationales `search` returns at most.
pub async fn connect(settings: &DatabaseSettings, context_limit: usize) -> Result<Db> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.url)
        .await?;

    // Run database migrations. This ensures the database schema is up-to-date.
    sqlx::migrate!("../../migrations").run(&pool).await?;

    Ok(Db {
        pool,
        context_limit: i64::try_from(context_limit).unwrap_or(i64::MAX),
    })
}

#[derive(Debug, FromRow)]
struct TradeRow {
    recorded_at: DateTime<Utc>,
    symbol: String,
    side: String,
    quantity: i64,
    entry_price: BigDecimal,
    stop: Option<BigDecimal>,
    target: Option<BigDecimal>,
    reason: String,
    order_id: String,
    client_order_id: String,
    source: String,
    confidence: Option<f64>,
    protected: bool,
}

fn to_big(value: Decimal) -> Result<BigDecimal> {
    BigDecimal::from_str(&value.to_string()).map_err(|_| Error::InvalidColumn {
        field: "numeric",
        value: value.to_string(),
    })
}

fn from_big(field: &'static str, value: &BigDecimal) -> Result<Decimal> {
    Decimal::from_str(&value.to_string()).map_err(|_| Error::InvalidColumn {
        field,
        value: value.to_string(),
    })
}

impl TryFrom<TradeRow> for TradeRecord {
    type Error = Error;

    fn try_from(row: TradeRow) -> Result<Self> {
        let invalid = |field, value: &str| Error::InvalidColumn { field, value: value.to_string() };
        Ok(TradeRecord {
            timestamp: row.recorded_at,
            side: row.side.parse().map_err(|_| invalid("side", &row.side))?,
            source: row.source.parse().map_err(|_| invalid("source", &row.source))?,
            quantity: u64::try_from(row.quantity)
                .map_err(|_| invalid("quantity", &row.quantity.to_string()))?,
            entry_price: from_big("entry_price", &row.entry_price)?,
            stop: row.stop.as_ref().map(|v| from_big("stop", v)).transpose()?,
            target: row.target.as_ref().map(|v| from_big("target", v)).transpose()?,
            symbol: Symbol(row.symbol),
            reason: row.reason,
            order_id: OrderId(row.order_id),
            client_order_id: ClientOrderId(row.client_order_id),
            confidence: row.confidence,
            protected: row.protected,
        })
    }
}

impl Db {
    /// The most recent records for `symbol`, newest first.
    pub async fn recent_records(&self, symbol: &Symbol, limit: i64) -> Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> = sqlx::query_as(
            r#"
            SELECT recorded_at, symbol, side, quantity, entry_price, stop, target, reason,
                   order_id, client_order_id, source, confidence, protected
            FROM trade_records
            WHERE upper(symbol) = upper($1)
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        )
        .bind(symbol.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::OperationFailed)?;

        rows.into_iter().map(TradeRecord::try_from).collect()
    }

    /// Distinct symbols that have at least one record.
    async fn known_symbols(&self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT DISTINCT symbol FROM trade_records")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::OperationFailed)
    }
}

#[async_trait]
impl TradeRecordSink for Db {
    fn name(&self) -> &'static str {
        "PostgresTradeLog"
    }

    async fn append(&self, record: &TradeRecord) -> Result<()> {
        let quantity = i64::try_from(record.quantity).map_err(|_| Error::InvalidColumn {
            field: "quantity",
            value: record.quantity.to_string(),
        })?;
        sqlx::query(
            r#"
            INSERT INTO trade_records (recorded_at, symbol, side, quantity, entry_price, stop, target,
                                       reason, order_id, client_order_id, source, confidence, protected)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (client_order_id) DO NOTHING
            "#,
        )
        .bind(record.timestamp)
        .bind(record.symbol.as_str())
        .bind(record.side.to_string())
        .bind(quantity)
        .bind(to_big(record.entry_price)?)
        .bind(record.stop.map(to_big).transpose()?)
        .bind(record.target.map(to_big).transpose()?)
        .bind(&record.reason)
        .bind(&record.order_id.0)
        .bind(record.client_order_id.as_str())
        .bind(record.source.to_string())
        .bind(record.confidence)
        .bind(record.protected)
        .execute(&self.pool)
        .await
        .map_err(Error::OperationFailed)?;
        Ok(())
    }
}

#[async_trait]
impl ContextSource for Db {
    fn name(&self) -> &'static str {
        "PostgresTradeLog"
    }

    async fn search(&self, query: &str) -> Result<String> {
        let mut lines = Vec::new();
        for symbol in self.known_symbols().await? {
            let symbol = Symbol(symbol);
            if !mentions(query, &symbol) {
                continue;
            }
            let mut records = self.recent_records(&symbol, self.context_limit).await?;
            records.reverse();
            lines.extend(records.iter().map(TradeRecord::rationale));
        }
        Ok(lines.join("\n"))
    }
}
