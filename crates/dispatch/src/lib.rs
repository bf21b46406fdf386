//! Signal admission for the copytrade execution engine.
//!
//! This crate provides the single logical admission point in front of the
//! dispatcher:
//! - An injected clock so admission windows are deterministic under test
//! - A per-key sliding-window rate limiter
//! - A bounded priority queue with FIFO tie-break
//! - The composed rate-limited dispatch queue, where entries are
//!   rate-governed and risk-reducing signals bypass the governor
//!
//! Producers are never blocked; rejection is the only backpressure signal.

/// Injectable time source.
pub mod clock;
/// Composed rate-limited dispatch queue.
pub mod dispatch;
/// Per-key sliding-window rate limiter.
pub mod rate_limiter;
/// Bounded priority queue.
pub mod queue;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::RateLimitedSignalQueue;
pub use queue::{QueuedSignal, SignalQueue};
pub use rate_limiter::RateLimiter;
