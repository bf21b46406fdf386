//! Integer-exact sizing for partial exits.

use crate::errors::EngineError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Converts an exit fraction into an atomic sell quantity.
///
/// A nonzero fraction always sells at least one atomic unit, fractional
/// results never round up, and `size_pct == 1` sells exactly what remains.
/// The result is capped at `size_remaining` so an exit can never oversell.
pub fn calculate_swap_amount(size_remaining: u64, size_pct: Decimal) -> Result<u64, EngineError> {
    if size_pct <= Decimal::ZERO || size_pct > Decimal::ONE {
        return Err(EngineError::InvalidExitSignal(format!(
            "size_pct {} outside (0, 1]",
            size_pct
        )));
    }
    if size_remaining == 0 {
        return Ok(0);
    }
    if size_pct == Decimal::ONE {
        return Ok(size_remaining);
    }

    let raw = (Decimal::from(size_remaining) * size_pct)
        .floor()
        .to_u64()
        .ok_or_else(|| {
            EngineError::InvalidExitSignal("sell amount exceeds integer range".to_string())
        })?;

    Ok(raw.max(1).min(size_remaining))
}
