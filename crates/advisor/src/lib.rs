// In crates/advisor/src/lib.rs

use async_trait::async_trait;
use core_types::{TradePlan, TradeSignal};

pub mod chat;
pub mod error;
pub mod parser;
pub mod prompt;

// Re-export public types
pub use chat::ChatCompletionAdvisor;
pub use error::{Error, Result};
pub use parser::parse_plan;

/// An external reasoning service that turns a raw signal into a trade plan.
///
/// Advisors are untrusted. Any `Err` is treated by the caller as "no plan",
/// and any `Ok` plan is still validated before it can size an order.
#[async_trait]
pub trait PlanAdvisor: Send + Sync {
    /// The name of the advisor (e.g., "primary", "fallback").
    fn name(&self) -> &'static str;

    /// Refines `signal`, using retrieved `context`, into a structured plan.
    async fn refine(&self, signal: &TradeSignal, context: &str) -> Result<TradePlan>;
}
