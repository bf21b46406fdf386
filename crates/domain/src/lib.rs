//! Core domain types for the copytrade execution engine.
//!
//! This crate holds the shared vocabulary of the engine:
//! - Tokens, amounts and prices
//! - Trade and exit signals with their priority ladder
//! - Positions and their lifecycle records
//! - Quotes and route candidates
//! - The closed error/rejection taxonomy
//! - Pure integer math for constant-product quoting and exit sizing
//!
//! No async code and no I/O live here; everything is a value type or a
//! pure function over value types.

/// Error and rejection taxonomy.
pub mod errors;
/// Market context snapshots consumed from upstream feeds.
pub mod market;
/// Pure math: constant-product quoting and exit sizing.
pub mod math;
/// Positions and lifecycle records.
pub mod position;
/// Quotes and route candidates.
pub mod quote;
/// Trade and exit signals.
pub mod signal;
/// Tokens, amounts and prices.
pub mod token;

pub use errors::{EngineError, RejectReason};
pub use market::MarketContext;
pub use position::{Position, PositionKey, PositionSnapshot, PositionStatus};
pub use quote::{Quote, RouteCandidate, RouteComparison};
pub use signal::{ExitSignal, ExitType, Priority, Side, SignalKind, TradeSignal};
pub use token::{Mint, Price, TokenAmount};
