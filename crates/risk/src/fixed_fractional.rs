// In crates/risk/src/fixed_fractional.rs

use crate::types::{RejectionReason, RiskConfig, RiskDecision};
use crate::RiskManager;
use core_types::{TradePlan, TradeSignal};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;

/// A risk manager that uses a fixed fractional position sizing model.
///
/// This manager implements three rules, evaluated in order:
/// 1. Vetoes trades without a usable stop (absent, or equal to the entry price).
/// 2. Sizes the position so that hitting the stop loses at most
///    `max_risk_per_trade` of equity, in whole units; vetoes if that is zero.
/// 3. Vetoes trades whose reward-to-risk ratio is below `min_reward_ratio`
///    when a target is known.
#[derive(Debug)]
pub struct FixedFractionalRiskManager {
    /// The configuration for this risk manager instance.
    config: RiskConfig,
}

impl FixedFractionalRiskManager {
    /// Creates a new `FixedFractionalRiskManager` from validated limits.
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }
}

impl RiskManager for FixedFractionalRiskManager {
    fn name(&self) -> &'static str {
        "FixedFractionalRiskManager"
    }

    fn config(&self) -> &RiskConfig {
        &self.config
    }

    fn assess(&self, equity: Decimal, signal: &TradeSignal, plan: &TradePlan) -> RiskDecision {
        let entry_price = signal.entry_price;

        // --- Rule 1: a stop we can measure risk against ---
        let Some(stop) = plan.stop else {
            return RiskDecision::reject(RejectionReason::InvalidStop);
        };
        let risk_per_unit = (entry_price - stop).abs();
        if risk_per_unit <= Decimal::ZERO {
            return RiskDecision::reject(RejectionReason::InvalidStop);
        }

        // --- Rule 2: position size for max risk ---
        let max_loss_amount = equity * self.config.max_risk_per_trade;
        // Overflow here means a stop distance too small to be meaningful.
        let Some(raw_quantity) = max_loss_amount.checked_div(risk_per_unit) else {
            return RiskDecision::reject(RejectionReason::InvalidStop);
        };
        let units = raw_quantity.floor();
        if units <= Decimal::ZERO {
            return RiskDecision::reject(RejectionReason::InsufficientEquity);
        }
        let Some(quantity) = units.to_u64() else {
            return RiskDecision::reject(RejectionReason::InvalidStop);
        };

        // --- Rule 3: reward-to-risk ---
        match plan.target {
            Some(target) => {
                let Some(reward_ratio) = (target - entry_price).abs().checked_div(risk_per_unit)
                else {
                    return RiskDecision::reject(RejectionReason::InvalidStop);
                };
                if reward_ratio < self.config.min_reward_ratio {
                    return RiskDecision::reject(RejectionReason::RewardRatioTooLow);
                }
            }
            None if self.config.require_target => {
                return RiskDecision::reject(RejectionReason::MissingTarget);
            }
            None => {}
        }

        RiskDecision::admit(quantity)
    }
}
