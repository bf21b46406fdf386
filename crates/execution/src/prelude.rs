//! Convenient re-exports for engine consumers.

pub use crate::engine::{Engine, EngineConfig, EngineEvent, USDC_MINT};
pub use crate::ledger::{BookStats, ExitOutcome, PositionBook, process_exit_signal};
pub use crate::trailing::{TrailingConfig, adjust_trail_distance};

pub use copytrade_dispatch::{
    Clock, ManualClock, QueuedSignal, RateLimitedSignalQueue, RateLimiter, SignalQueue,
    SystemClock,
};
pub use copytrade_domain::{
    EngineError, ExitSignal, ExitType, MarketContext, Position, PositionKey, PositionSnapshot,
    PositionStatus, Price, Priority, Quote, RejectReason, RouteCandidate, RouteComparison, Side,
    SignalKind, TokenAmount, TradeSignal,
};
pub use copytrade_routing::{
    AggregatorConfig, AggregatorSource, LocalPoolSource, QuoteRouter, QuoteSource, RouterConfig,
};
