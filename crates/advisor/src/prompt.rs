// In crates/advisor/src/prompt.rs

use core_types::TradeSignal;
use rust_decimal::Decimal;

/// System message sent with every request.
pub const SYSTEM_PROMPT: &str = "You are a trading risk assistant. You review trade signals and \
reply with a single JSON object and nothing else.";

fn level(value: Option<Decimal>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.normalize().to_string())
}

/// Renders the user message for `signal`, with retrieved `context` inlined.
pub fn build_prompt(signal: &TradeSignal, context: &str) -> String {
    let context = if context.trim().is_empty() { "none" } else { context.trim() };
    format!(
        "Trade signal: {side} {symbol} at {entry}. Stop ~{stop}, Target ~{target}. Reason: {reason}.\n\
         Context: {context}\n\
         Assess this trade and suggest precise stop and target. Respond only with a JSON object \
         with keys symbol, side, stop, target, confidence, reason.",
        side = signal.side,
        symbol = signal.symbol,
        entry = signal.entry_price.normalize(),
        stop = level(signal.stop_guess),
        target = level(signal.target_guess),
        reason = signal.reason,
    )
}
