// In crates/advisor/src/parser.rs

use crate::{Error, Result};
use core_types::{Side, Symbol, TradePlan};
use rust_decimal::Decimal;
use serde::Deserialize;

/// The exact shape an advisor must reply with.
///
/// Every key is required (`null` is allowed for the optional levels) and
/// unknown keys are rejected, so a reply that drifts from the contract
/// yields no plan rather than a half-understood one.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanReply {
    symbol: String,
    side: Side,
    #[serde(deserialize_with = "Option::deserialize")]
    stop: Option<Decimal>,
    #[serde(deserialize_with = "Option::deserialize")]
    target: Option<Decimal>,
    #[serde(deserialize_with = "Option::deserialize")]
    confidence: Option<f64>,
    reason: String,
}

/// Removes one surrounding markdown code fence, if present.
fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = body.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json` on the opening fence line.
    match body.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with('{') => rest.trim(),
        _ => body.trim(),
    }
}

/// Parses an advisor's message content into a `TradePlan`.
pub fn parse_plan(content: &str) -> Result<TradePlan> {
    let reply: PlanReply = serde_json::from_str(strip_fence(content))?;

    if reply.symbol.trim().is_empty() {
        return Err(Error::Schema("symbol is empty".to_string()));
    }
    if let Some(confidence) = reply.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::Schema(format!("confidence {confidence} is outside [0, 1]")));
        }
    }

    Ok(TradePlan {
        symbol: Symbol(reply.symbol.trim().to_string()),
        side: reply.side,
        stop: reply.stop,
        target: reply.target,
        confidence: reply.confidence,
        reason: reply.reason,
    })
}
