// In crates/risk/src/types.rs

use crate::{Error, Result};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw risk settings as they appear in the configuration files.
#[derive(Debug, Deserialize, Clone)]
pub struct RiskSettings {
    /// Fraction of equity that may be lost on a single trade (e.g., 0.02 for 2%).
    pub max_risk_per_trade: f64,
    /// Minimum reward-to-risk ratio (e.g., 3.0 for 3:1).
    pub min_reward_ratio: f64,
    /// Maximum number of concurrently open positions.
    pub max_positions: u32,
    /// Reject plans that carry no target instead of skipping the ratio check.
    #[serde(default)]
    pub require_target: bool,
}

/// Validated, process-wide risk limits. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub max_risk_per_trade: Decimal,
    pub min_reward_ratio: Decimal,
    pub max_positions: u32,
    pub require_target: bool,
}

impl RiskConfig {
    pub fn new(
        max_risk_per_trade: Decimal,
        min_reward_ratio: Decimal,
        max_positions: u32,
        require_target: bool,
    ) -> Result<Self> {
        if max_risk_per_trade <= Decimal::ZERO || max_risk_per_trade > Decimal::ONE {
            return Err(Error::InvalidParameters(format!(
                "max_risk_per_trade must be in (0, 1], got {max_risk_per_trade}"
            )));
        }
        if min_reward_ratio < Decimal::ZERO {
            return Err(Error::InvalidParameters(format!(
                "min_reward_ratio must be >= 0, got {min_reward_ratio}"
            )));
        }
        if max_positions == 0 {
            return Err(Error::InvalidParameters(
                "max_positions must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            max_risk_per_trade,
            min_reward_ratio,
            max_positions,
            require_target,
        })
    }
}

impl TryFrom<&RiskSettings> for RiskConfig {
    type Error = Error;

    fn try_from(settings: &RiskSettings) -> Result<Self> {
        let to_decimal = |name: &str, value: f64| {
            Decimal::from_f64(value).ok_or_else(|| {
                Error::InvalidParameters(format!("{name} is not a finite number: {value}"))
            })
        };
        RiskConfig::new(
            to_decimal("max_risk_per_trade", settings.max_risk_per_trade)?,
            to_decimal("min_reward_ratio", settings.min_reward_ratio)?,
            settings.max_positions,
            settings.require_target,
        )
    }
}

/// Why a trade was not admitted. These are expected outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    InvalidStop,
    InsufficientEquity,
    RewardRatioTooLow,
    MaxPositionsReached,
    MissingTarget,
    InvalidPlan,
    InvalidSignal,
    BrokerError,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionReason::InvalidStop => "invalid stop",
            RejectionReason::InsufficientEquity => "insufficient equity",
            RejectionReason::RewardRatioTooLow => "reward ratio too low",
            RejectionReason::MaxPositionsReached => "max positions reached",
            RejectionReason::MissingTarget => "missing target",
            RejectionReason::InvalidPlan => "invalid plan",
            RejectionReason::InvalidSignal => "invalid signal",
            RejectionReason::BrokerError => "broker error",
        };
        f.write_str(text)
    }
}

/// The admit/reject verdict of a `RiskManager`.
///
/// Constructed only through [`RiskDecision::admit`] and
/// [`RiskDecision::reject`], so `is_admitted() == (quantity() > 0)` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskDecision {
    admitted: bool,
    quantity: u64,
    rejection_reason: Option<RejectionReason>,
}

impl RiskDecision {
    /// Admits a trade of `quantity` units. A zero quantity is never admitted.
    pub fn admit(quantity: u64) -> Self {
        if quantity == 0 {
            return Self::reject(RejectionReason::InsufficientEquity);
        }
        Self {
            admitted: true,
            quantity,
            rejection_reason: None,
        }
    }

    pub fn reject(reason: RejectionReason) -> Self {
        Self {
            admitted: false,
            quantity: 0,
            rejection_reason: Some(reason),
        }
    }

    pub fn is_admitted(&self) -> bool {
        self.admitted
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        self.rejection_reason
    }
}
