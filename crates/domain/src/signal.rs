//! Trade and exit signals with their priority ladder.

use crate::errors::EngineError;
use crate::token::{Mint, TokenAmount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dispatch priority. Smaller numbers are served sooner; equal priorities
/// resolve FIFO by enqueue sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(pub u8);

impl Priority {
    /// Risk-critical signals (forced liquidation, kill switch).
    pub const CRITICAL: Priority = Priority(0);
    /// Exit signals. Must never be starved behind entries.
    pub const EXIT: Priority = Priority(10);
    /// Discretionary entry signals.
    pub const ENTRY: Priority = Priority(50);
    /// Anything unclassified.
    pub const DEFAULT: Priority = Priority(100);
}

impl Default for Priority {
    fn default() -> Self {
        Priority::DEFAULT
    }
}

/// Trade direction relative to the base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// Why an exit occurred. The quantity semantics are identical across the
/// attribution variants; the type records why, not how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitType {
    /// Reduce the position by a fraction of what remains.
    Partial,
    /// Close the remaining position at market.
    MarketClose,
    /// Take-profit close (attribution for a market close).
    TakeProfit,
    /// Stop-loss close (attribution for a market close).
    StopLoss,
    /// Time-based close (attribution for a market close).
    Time,
    /// Recompute trailing stop levels; moves no size.
    TrailingStopUpdate,
}

impl ExitType {
    /// Whether this variant sells size (as opposed to adjusting levels).
    pub fn moves_size(&self) -> bool {
        !matches!(self, ExitType::TrailingStopUpdate)
    }
}

/// One lifecycle event for an open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    /// Exit taxonomy entry.
    pub exit_type: ExitType,
    /// Fraction of the remaining size to sell, in (0, 1] for size-moving
    /// variants.
    pub size_pct: Decimal,
    /// Trailing stop distance as a fraction of current price.
    pub trail_stop_pct: Option<Decimal>,
    /// Trailing activation distance as a fraction of current price.
    pub trail_activation_pct: Option<Decimal>,
}

impl ExitSignal {
    /// Partial exit of a fraction of the remaining size.
    pub fn partial(size_pct: Decimal) -> Self {
        Self {
            exit_type: ExitType::Partial,
            size_pct,
            trail_stop_pct: None,
            trail_activation_pct: None,
        }
    }

    /// Full market close of the remaining size.
    pub fn market_close() -> Self {
        Self {
            exit_type: ExitType::MarketClose,
            size_pct: Decimal::ONE,
            trail_stop_pct: None,
            trail_activation_pct: None,
        }
    }

    /// Full close attributed to the given taxonomy entry.
    pub fn close_as(exit_type: ExitType) -> Self {
        Self {
            exit_type,
            size_pct: Decimal::ONE,
            trail_stop_pct: None,
            trail_activation_pct: None,
        }
    }

    /// Trailing stop recomputation. Moves no size.
    pub fn trailing_update(trail_stop_pct: Decimal, trail_activation_pct: Decimal) -> Self {
        Self {
            exit_type: ExitType::TrailingStopUpdate,
            size_pct: Decimal::ZERO,
            trail_stop_pct: Some(trail_stop_pct),
            trail_activation_pct: Some(trail_activation_pct),
        }
    }

    /// Rejects out-of-domain signals before any position mutation.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.exit_type.moves_size() {
            if self.size_pct <= Decimal::ZERO || self.size_pct > Decimal::ONE {
                return Err(EngineError::InvalidExitSignal(format!(
                    "size_pct {} outside (0, 1]",
                    self.size_pct
                )));
            }
        } else if self.trail_stop_pct.is_none() || self.trail_activation_pct.is_none() {
            return Err(EngineError::InvalidExitSignal(
                "trailing update requires stop and activation percentages".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a signal asks the engine to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalKind {
    /// Open or add to a position with the given input amount.
    Entry {
        /// Amount of the quote asset to spend, in atomic units.
        amount_in: TokenAmount,
    },
    /// Reduce, close or adjust an existing position.
    Exit(ExitSignal),
}

/// A candidate trade produced by upstream analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Signal identifier.
    pub id: Uuid,
    /// Followed wallet the signal was derived from.
    pub wallet: String,
    /// Token mint being traded.
    pub mint: Mint,
    /// Trade direction.
    pub side: Side,
    /// Upstream venue/feed whose admission quota this signal consumes.
    pub provider_key: String,
    /// Requested action.
    pub kind: SignalKind,
}

impl TradeSignal {
    /// Creates an entry signal.
    pub fn entry(
        wallet: impl Into<String>,
        mint: impl Into<Mint>,
        provider_key: impl Into<String>,
        amount_in: TokenAmount,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet: wallet.into(),
            mint: mint.into(),
            side: Side::Buy,
            provider_key: provider_key.into(),
            kind: SignalKind::Entry { amount_in },
        }
    }

    /// Creates an exit signal.
    pub fn exit(
        wallet: impl Into<String>,
        mint: impl Into<Mint>,
        provider_key: impl Into<String>,
        exit: ExitSignal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet: wallet.into(),
            mint: mint.into(),
            side: Side::Sell,
            provider_key: provider_key.into(),
            kind: SignalKind::Exit(exit),
        }
    }

    /// Whether the signal reduces risk and may bypass admission limits.
    pub fn is_risk_reducing(&self) -> bool {
        matches!(self.kind, SignalKind::Exit(_))
    }

    /// Default dispatch priority for this signal.
    pub fn default_priority(&self) -> Priority {
        match &self.kind {
            SignalKind::Entry { .. } => Priority::ENTRY,
            SignalKind::Exit(_) => Priority::EXIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_priority_ladder_ordering() {
        assert!(Priority::CRITICAL < Priority::EXIT);
        assert!(Priority::EXIT < Priority::ENTRY);
        assert!(Priority::ENTRY < Priority::DEFAULT);
        assert_eq!(Priority::default(), Priority(100));
    }

    #[test]
    fn test_exit_signal_validation() {
        assert!(ExitSignal::partial(dec!(0.5)).validate().is_ok());
        assert!(ExitSignal::market_close().validate().is_ok());

        // Out-of-domain fractions are rejected, not clamped.
        assert!(ExitSignal::partial(dec!(0)).validate().is_err());
        assert!(ExitSignal::partial(dec!(1.5)).validate().is_err());
        assert!(ExitSignal::partial(dec!(-0.1)).validate().is_err());
    }

    #[test]
    fn test_trailing_update_requires_percentages() {
        let ok = ExitSignal::trailing_update(dec!(0.05), dec!(0.03));
        assert!(ok.validate().is_ok());

        let missing = ExitSignal {
            exit_type: ExitType::TrailingStopUpdate,
            size_pct: Decimal::ZERO,
            trail_stop_pct: Some(dec!(0.05)),
            trail_activation_pct: None,
        };
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_exit_signals_bypass_admission() {
        let entry = TradeSignal::entry("wallet", "mint", "rpc", TokenAmount::from(1_000u64));
        let exit = TradeSignal::exit("wallet", "mint", "rpc", ExitSignal::market_close());

        assert!(!entry.is_risk_reducing());
        assert!(exit.is_risk_reducing());
        assert_eq!(entry.default_priority(), Priority::ENTRY);
        assert_eq!(exit.default_priority(), Priority::EXIT);
    }
}
