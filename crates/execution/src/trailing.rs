//! Trailing stop distance adjustment from live market context.

use copytrade_domain::MarketContext;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::trace;

/// Tuning for the trailing distance policy.
#[derive(Debug, Clone)]
pub struct TrailingConfig {
    /// Realized volatility under which the distance stays at base.
    pub rv_threshold_low: Decimal,
    /// Realized volatility at which the full widening applies.
    pub rv_threshold_high: Decimal,
    /// Widening factor applied at high realized volatility.
    pub volatility_multiplier: Decimal,
    /// Volume ratio confirming a genuine move.
    pub volume_confirm_threshold: Decimal,
    /// Extra widening when volume confirms the move.
    pub volume_multiplier: Decimal,
    /// Hard cap on the emitted distance.
    pub max_distance_bps: u32,
}

impl Default for TrailingConfig {
    fn default() -> Self {
        Self {
            rv_threshold_low: Decimal::new(2, 2),     // 0.02
            rv_threshold_high: Decimal::new(6, 2),    // 0.06
            volatility_multiplier: Decimal::new(15, 1), // 1.5x
            volume_confirm_threshold: Decimal::new(2, 0),
            volume_multiplier: Decimal::new(12, 1),   // 1.2x
            max_distance_bps: 2_000,                  // 20%
        }
    }
}

/// Derives the trailing stop distance for the current market context.
///
/// High realized volatility widens the distance (tolerating noise), low
/// volatility narrows it back to base, and a confirming volume surge
/// widens it further (tolerating retracement on a genuine move). Between
/// the volatility thresholds the widening interpolates linearly, so the
/// output is monotone non-decreasing in realized volatility. The result
/// clamps to `[0, max_distance_bps]`.
///
/// This emits a distance only; applying it to a position's stop levels is
/// the ledger's job, which preserves the ratchet.
pub fn adjust_trail_distance(
    base_distance_bps: u32,
    context: &MarketContext,
    config: &TrailingConfig,
) -> u32 {
    let base = Decimal::from(base_distance_bps);
    let rv = context.realized_volatility;

    let volatility_factor = if rv >= config.rv_threshold_high {
        config.volatility_multiplier
    } else if rv <= config.rv_threshold_low {
        Decimal::ONE
    } else {
        let span = config.rv_threshold_high - config.rv_threshold_low;
        let progress = (rv - config.rv_threshold_low) / span;
        Decimal::ONE + (config.volatility_multiplier - Decimal::ONE) * progress
    };

    let mut distance = base * volatility_factor;
    if context.volume_ratio >= config.volume_confirm_threshold {
        distance *= config.volume_multiplier;
    }

    let adjusted = distance
        .floor()
        .to_u32()
        .unwrap_or(config.max_distance_bps)
        .min(config.max_distance_bps);

    trace!(
        mint = %context.mint,
        base_distance_bps,
        adjusted,
        rv = %rv,
        volume_ratio = %context.volume_ratio,
        "trail distance adjusted"
    );
    adjusted
}
