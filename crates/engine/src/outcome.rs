// In crates/engine/src/outcome.rs

use core_types::OrderId;
use execution::BrokerError;
use risk::RejectionReason;
use std::fmt;

/// Where a signal's journey through the pipeline ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    /// Neither advisor produced a usable plan. No order was placed.
    PlanUnavailable,
    /// The signal was refused before or at the venue.
    Rejected {
        reason: RejectionReason,
        /// Set when `reason` is [`RejectionReason::BrokerError`].
        broker_error: Option<BrokerError>,
    },
    /// The order was submitted and every sink stored the record.
    Recorded { order_id: OrderId },
    /// The order was submitted but some sinks failed to store the record.
    RecordPartial {
        order_id: OrderId,
        failed_sinks: Vec<&'static str>,
    },
}

impl SignalOutcome {
    pub fn rejected(reason: RejectionReason) -> Self {
        SignalOutcome::Rejected { reason, broker_error: None }
    }

    pub fn broker_rejected(error: BrokerError) -> Self {
        SignalOutcome::Rejected {
            reason: RejectionReason::BrokerError,
            broker_error: Some(error),
        }
    }

    /// The venue order id, if the order was submitted.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            SignalOutcome::Recorded { order_id } | SignalOutcome::RecordPartial { order_id, .. } => {
                Some(order_id)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SignalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalOutcome::PlanUnavailable => f.write_str("plan unavailable"),
            SignalOutcome::Rejected { reason, broker_error: Some(e) } => write!(f, "rejected: {reason} ({e})"),
            SignalOutcome::Rejected { reason, broker_error: None } => write!(f, "rejected: {reason}"),
            SignalOutcome::Recorded { order_id } => write!(f, "recorded {order_id}"),
            SignalOutcome::RecordPartial { order_id, failed_sinks } => {
                write!(f, "recorded {order_id}, failed sinks: {}", failed_sinks.join(", "))
            }
        }
    }
}
