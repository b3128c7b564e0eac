// In crates/risk/src/plan_guard.rs

// Sanity checks applied to advisor output before it reaches position sizing.
// A plan that contradicts its own signal or puts protective levels on the
// wrong side of the entry is refused, never clamped.

use core_types::{Side, TradePlan, TradeSignal};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanViolation {
    #[error("plan symbol {plan} does not match signal symbol {signal}")]
    SymbolMismatch { signal: String, plan: String },

    #[error("plan side {plan} does not match signal side {signal}")]
    SideMismatch { signal: Side, plan: Side },

    #[error("{level} must be positive, got {value}")]
    NonPositiveLevel { level: &'static str, value: Decimal },

    #[error("{level} {value} is on the wrong side of entry {entry} for a {side} trade")]
    WrongSideOfEntry {
        level: &'static str,
        value: Decimal,
        entry: Decimal,
        side: Side,
    },

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

/// Validates an advisor plan against the signal it was derived from.
pub fn validate_plan(signal: &TradeSignal, plan: &TradePlan) -> Result<(), PlanViolation> {
    if !plan.symbol.0.eq_ignore_ascii_case(&signal.symbol.0) {
        return Err(PlanViolation::SymbolMismatch {
            signal: signal.symbol.0.clone(),
            plan: plan.symbol.0.clone(),
        });
    }
    if plan.side != signal.side {
        return Err(PlanViolation::SideMismatch {
            signal: signal.side,
            plan: plan.side,
        });
    }

    let entry = signal.entry_price;
    if let Some(stop) = plan.stop {
        check_level("stop", stop, entry, signal.side, Side::Sell)?;
    }
    if let Some(target) = plan.target {
        check_level("target", target, entry, signal.side, Side::Buy)?;
    }

    if let Some(confidence) = plan.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PlanViolation::ConfidenceOutOfRange(confidence));
        }
    }
    Ok(())
}

/// `above_for` is the trade side for which the level must sit above entry.
fn check_level(
    level: &'static str,
    value: Decimal,
    entry: Decimal,
    side: Side,
    above_for: Side,
) -> Result<(), PlanViolation> {
    if value <= Decimal::ZERO {
        return Err(PlanViolation::NonPositiveLevel { level, value });
    }
    // A level equal to entry is left for the risk manager to judge.
    let consistent = if side == above_for {
        value >= entry
    } else {
        value <= entry
    };
    if !consistent {
        return Err(PlanViolation::WrongSideOfEntry {
            level,
            value,
            entry,
            side,
        });
    }
    Ok(())
}
