// In crates/risk/src/lib.rs

use core_types::{TradePlan, TradeSignal};
use rust_decimal::Decimal;

pub mod error;
pub mod fixed_fractional;
pub mod plan_guard;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use fixed_fractional::FixedFractionalRiskManager;
pub use plan_guard::{validate_plan, PlanViolation};
pub use types::{RejectionReason, RiskConfig, RiskDecision, RiskSettings};

/// The universal interface for a risk management module.
///
/// A `RiskManager` turns an account equity snapshot, a `TradeSignal` and the
/// advisor's `TradePlan` into an admit/reject verdict with a sized quantity.
/// Implementations must be pure: the same inputs always yield the same
/// decision, and no I/O happens here.
pub trait RiskManager: Send + Sync {
    /// The name of the risk management strategy.
    fn name(&self) -> &'static str;

    /// The immutable limits this manager enforces.
    fn config(&self) -> &RiskConfig;

    /// Sizes and vets a single trade.
    ///
    /// # Arguments
    ///
    /// * `equity`: The account equity snapshot; expected to be positive.
    /// * `signal`: The originating signal, which supplies the entry price.
    /// * `plan`: The refined plan, which supplies the stop and target.
    fn assess(&self, equity: Decimal, signal: &TradeSignal, plan: &TradePlan) -> RiskDecision;
}
