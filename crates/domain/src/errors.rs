//! Closed error taxonomy for the execution core.
//!
//! Every rejection carries a stable reason code so downstream reporting can
//! attribute why a signal did not execute. Callers branch on variants, not
//! on message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable rejection reason attached to every non-fatal refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// The signal queue is at capacity.
    QueueFull,
    /// The provider's admission quota is exhausted.
    RateLimited,
    /// The signal is malformed (out-of-domain size, missing fields).
    InvalidSignal,
    /// No liquidity source produced a usable quote.
    NoRouteAvailable,
    /// A pool cannot quote (zero reserves).
    InvalidPool,
}

impl RejectReason {
    /// Stable wire code for reporting collaborators.
    pub fn as_code(&self) -> &'static str {
        match self {
            RejectReason::QueueFull => "queue-full",
            RejectReason::RateLimited => "rate-limited",
            RejectReason::InvalidSignal => "invalid-signal",
            RejectReason::NoRouteAvailable => "no-route-available",
            RejectReason::InvalidPool => "invalid-pool",
        }
    }
}

/// Errors surfaced by the execution core.
///
/// Admission and routing failures are recoverable and local; none of them
/// abort the engine. Per-source quote failures are isolated by the router
/// and never propagate past it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A signal was refused at the admission point.
    #[error("admission rejected: {}", reason.as_code())]
    AdmissionRejected {
        /// Why admission was refused.
        reason: RejectReason,
    },

    /// The router found no usable quote for the requested swap.
    #[error("no route available for {mint_in} -> {mint_out}")]
    NoRouteAvailable {
        /// Input mint of the requested swap.
        mint_in: String,
        /// Output mint of the requested swap.
        mint_out: String,
    },

    /// A single quote source failed or timed out.
    #[error("quote source '{source}' failed: {message}")]
    QuoteSourceFailure {
        /// Name of the failing source.
        source: String,
        /// Failure detail for logs.
        message: String,
    },

    /// A pool cannot produce a quote.
    #[error("invalid pool: {0}")]
    InvalidPool(String),

    /// An exit signal was rejected before any position mutation.
    #[error("invalid exit signal: {0}")]
    InvalidExitSignal(String),
}

impl EngineError {
    /// Maps the error onto its rejection reason, where one applies.
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            EngineError::AdmissionRejected { reason } => *reason,
            EngineError::NoRouteAvailable { .. } => RejectReason::NoRouteAvailable,
            EngineError::QuoteSourceFailure { .. } => RejectReason::NoRouteAvailable,
            EngineError::InvalidPool(_) => RejectReason::InvalidPool,
            EngineError::InvalidExitSignal(_) => RejectReason::InvalidSignal,
        }
    }
}
