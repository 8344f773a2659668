//! The Tally consistency engine.
//!
//! For every business event (sale, purchase, payment, refund, adjustment,
//! expense) the engine atomically appends the immutable ledger entries the
//! event implies, chains their running balances, and mutates the matching
//! aggregate rows, under per-entity locks with bounded optimistic retries.

mod effects;
mod error;
mod inventory;
mod locks;
mod orchestrator;
mod report;
pub mod resolver;

pub use effects::{
    counterparty_effect, movement_delta, weighted_avg_cost, CounterpartyEffect, StockDirection,
};
pub use error::{EngineError, EngineResult};
pub use inventory::{MovementRequest, RevaluationRequest};
pub use locks::{LockKey, LockRegistry};
pub use orchestrator::{Engine, DEFAULT_MAX_RETRIES};
pub use report::{current_month_query, MainAccountReport, DEFAULT_REPORT_LIMIT};
pub use resolver::{CounterpartyPosition, MainPosition, StockPosition};
