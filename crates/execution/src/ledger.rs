//! Position lifecycle state machine and the concurrent position book.

use chrono::Utc;
use copytrade_domain::math::calculate_swap_amount;
use copytrade_domain::{
    EngineError, ExitSignal, ExitType, Position, PositionKey, PositionSnapshot, PositionStatus,
    Price,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Result of applying one exit signal to a position.
#[derive(Debug, Clone)]
pub struct ExitOutcome {
    /// The position after the transition.
    pub position: Position,
    /// Atomic units sold by this transition.
    pub amount_sold: u64,
    /// Whether the transition closed the position.
    pub is_closed: bool,
}

/// Applies one exit signal to a position.
///
/// Pure transition: the input position is untouched and the signal is
/// validated before any state is derived, so a rejected signal leaves
/// nothing to unwind. Size math is integer-exact; `size_pct == 1` sells
/// exactly what remains.
pub fn process_exit_signal(
    position: &Position,
    signal: &ExitSignal,
    current_price: Price,
) -> Result<ExitOutcome, EngineError> {
    signal.validate()?;

    if position.status == PositionStatus::Closed {
        return Err(EngineError::InvalidExitSignal(format!(
            "position {} is already closed",
            position.id
        )));
    }

    let mut next = position.clone();

    if signal.exit_type == ExitType::TrailingStopUpdate {
        apply_trailing_update(&mut next, signal, current_price);
        return Ok(ExitOutcome {
            position: next,
            amount_sold: 0,
            is_closed: false,
        });
    }

    let amount_sold = calculate_swap_amount(position.size_remaining, signal.size_pct)?;
    next.size_remaining = position.size_remaining - amount_sold;
    next.realized_pnl += (current_price.0 - position.entry_price.0) * Decimal::from(amount_sold);

    let is_closed = next.size_remaining == 0;
    if is_closed {
        next.status = PositionStatus::Closed;
        next.closed_at = Some(Utc::now());
        info!(
            position = %next.id,
            exit_type = ?signal.exit_type,
            realized_pnl = %next.realized_pnl,
            "position closed"
        );
    } else {
        debug!(
            position = %next.id,
            amount_sold,
            size_remaining = next.size_remaining,
            "partial exit"
        );
    }

    Ok(ExitOutcome {
        position: next,
        amount_sold,
        is_closed,
    })
}

/// Recomputes trailing levels from the current price, honoring the
/// ratchet: a candidate stop that would loosen protection is ignored, and
/// the activation level only moves together with an accepted stop.
fn apply_trailing_update(position: &mut Position, signal: &ExitSignal, current_price: Price) {
    // validate() guarantees both percentages are present.
    let stop_pct = signal.trail_stop_pct.unwrap_or_default();
    let activation_pct = signal.trail_activation_pct.unwrap_or_default();

    let candidate_stop = Price::new(current_price.0 * (Decimal::ONE - stop_pct));
    let candidate_activation = Price::new(current_price.0 * (Decimal::ONE + activation_pct));

    if let Some(existing) = position.trail_stop_price
        && candidate_stop <= existing
    {
        debug!(
            position = %position.id,
            existing = %existing,
            candidate = %candidate_stop,
            "trailing update ignored: stop would loosen"
        );
        return;
    }

    position.trail_stop_price = Some(candidate_stop);
    position.trail_activation_price = Some(candidate_activation);
    debug!(
        position = %position.id,
        stop = %candidate_stop,
        activation = %candidate_activation,
        "trailing levels ratcheted"
    );
}

/// Aggregate statistics across the book.
#[derive(Debug, Clone, Default)]
pub struct BookStats {
    /// Positions ever tracked.
    pub total_positions: usize,
    /// Currently open positions.
    pub open_positions: usize,
    /// Archived closed positions.
    pub closed_positions: usize,
    /// Realized P&L summed over all positions, in quote units.
    pub total_realized_pnl: Decimal,
}

/// Concurrent store of live positions.
///
/// Each position sits behind its own lock so mutations to one
/// `(wallet, mint)` lifecycle serialize while distinct positions proceed
/// in parallel. Closed positions move to an archive and stay queryable.
pub struct PositionBook {
    positions: RwLock<HashMap<PositionKey, Arc<Mutex<Position>>>>,
    closed: RwLock<Vec<Position>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self {
            positions: RwLock::new(HashMap::new()),
            closed: RwLock::new(Vec::new()),
        }
    }

    /// Creates a position from its first fill. A second entry for the same
    /// `(wallet, mint)` while one is open is rejected; sizing up an open
    /// position is the upstream allocator's decision, not an implicit merge.
    pub async fn open(
        &self,
        wallet: impl Into<String>,
        mint: impl Into<String>,
        entry_price: Price,
        size: u64,
    ) -> Result<Position, EngineError> {
        let position = Position::open(wallet, mint, entry_price, size);
        let key = position.key();

        let mut positions = self.positions.write().await;
        if positions.contains_key(&key) {
            return Err(EngineError::InvalidExitSignal(format!(
                "position already open for {}/{}",
                key.wallet, key.mint
            )));
        }

        info!(
            position = %position.id,
            wallet = %key.wallet,
            mint = %key.mint,
            size,
            entry_price = %entry_price,
            "position opened"
        );
        positions.insert(key, Arc::new(Mutex::new(position.clone())));
        Ok(position)
    }

    /// Applies an exit signal to the position owned by `key`, serialized
    /// against every other mutation of the same position. Closing moves
    /// the position into the archive.
    pub async fn apply_exit(
        &self,
        key: &PositionKey,
        signal: &ExitSignal,
        current_price: Price,
    ) -> Result<ExitOutcome, EngineError> {
        let slot = {
            let positions = self.positions.read().await;
            positions.get(key).cloned()
        };
        let Some(slot) = slot else {
            return Err(EngineError::InvalidExitSignal(format!(
                "no open position for {}/{}",
                key.wallet, key.mint
            )));
        };

        let outcome = {
            let mut position = slot.lock().await;
            let outcome = process_exit_signal(&position, signal, current_price)?;
            *position = outcome.position.clone();
            outcome
        };

        if outcome.is_closed {
            self.retire(key, outcome.position.clone()).await;
        }
        Ok(outcome)
    }

    /// Ratchets trailing levels on every open position for `mint`.
    /// Returns how many positions accepted the update.
    pub async fn apply_trailing(
        &self,
        mint: &str,
        trail_stop_pct: Decimal,
        trail_activation_pct: Decimal,
        current_price: Price,
    ) -> usize {
        let slots: Vec<Arc<Mutex<Position>>> = {
            let positions = self.positions.read().await;
            positions
                .iter()
                .filter(|(key, _)| key.mint == mint)
                .map(|(_, slot)| slot.clone())
                .collect()
        };

        let signal = ExitSignal::trailing_update(trail_stop_pct, trail_activation_pct);
        let mut updated = 0;
        for slot in slots {
            let mut position = slot.lock().await;
            let before = position.trail_stop_price;
            if let Ok(outcome) = process_exit_signal(&position, &signal, current_price) {
                *position = outcome.position;
                if position.trail_stop_price != before {
                    updated += 1;
                }
            }
        }
        updated
    }

    /// Moves a closed position out of the live map into the archive.
    async fn retire(&self, key: &PositionKey, position: Position) {
        let mut positions = self.positions.write().await;
        positions.remove(key);
        drop(positions);

        self.closed.write().await.push(position);
    }

    /// Snapshot of the live or archived position for `key`, newest first
    /// for archived ones.
    pub async fn snapshot(&self, key: &PositionKey) -> Option<PositionSnapshot> {
        {
            let positions = self.positions.read().await;
            if let Some(slot) = positions.get(key) {
                return Some(slot.lock().await.snapshot());
            }
        }
        let closed = self.closed.read().await;
        closed
            .iter()
            .rev()
            .find(|p| &p.key() == key)
            .map(Position::snapshot)
    }

    /// All currently open positions.
    pub async fn open_positions(&self) -> Vec<Position> {
        let positions = self.positions.read().await;
        let mut out = Vec::with_capacity(positions.len());
        for slot in positions.values() {
            out.push(slot.lock().await.clone());
        }
        out
    }

    /// Aggregate statistics across live and archived positions.
    pub async fn aggregate_stats(&self) -> BookStats {
        let mut stats = BookStats::default();

        for position in self.open_positions().await {
            stats.open_positions += 1;
            stats.total_realized_pnl += position.realized_pnl;
        }
        let closed = self.closed.read().await;
        for position in closed.iter() {
            stats.closed_positions += 1;
            stats.total_realized_pnl += position.realized_pnl;
        }
        stats.total_positions = stats.open_positions + stats.closed_positions;
        stats
    }
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}
