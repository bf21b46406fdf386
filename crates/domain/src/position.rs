//! Positions and their lifecycle records.

use crate::token::{Mint, Price};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position lifecycle state. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Identifies the exclusive-ownership unit: one logical lifecycle per
/// followed wallet and mint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    /// Followed wallet.
    pub wallet: String,
    /// Token mint.
    pub mint: Mint,
}

impl PositionKey {
    pub fn new(wallet: impl Into<String>, mint: impl Into<Mint>) -> Self {
        Self {
            wallet: wallet.into(),
            mint: mint.into(),
        }
    }
}

/// An open or archived position.
///
/// Invariants, maintained exclusively by the ledger:
/// - `size_remaining <= size_initial`
/// - `status == Closed` iff `size_remaining == 0`
/// - `trail_stop_price`, once set, only ratchets toward protection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Position identifier.
    pub id: Uuid,
    /// Followed wallet.
    pub wallet: String,
    /// Token mint.
    pub mint: Mint,
    /// Average entry price.
    pub entry_price: Price,
    /// Size at entry, in atomic units.
    pub size_initial: u64,
    /// Unsold size, in atomic units.
    pub size_remaining: u64,
    /// Realized P&L in quote units, accumulated across exits.
    pub realized_pnl: Decimal,
    /// Lifecycle state.
    pub status: PositionStatus,
    /// Trailing stop level, once armed.
    pub trail_stop_price: Option<Price>,
    /// Price at which the trailing stop activates.
    pub trail_activation_price: Option<Price>,
    /// When the position was opened.
    pub opened_at: DateTime<Utc>,
    /// When the position was closed, for archived positions.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Creates a freshly opened position from its first fill.
    pub fn open(
        wallet: impl Into<String>,
        mint: impl Into<Mint>,
        entry_price: Price,
        size: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet: wallet.into(),
            mint: mint.into(),
            entry_price,
            size_initial: size,
            size_remaining: size,
            realized_pnl: Decimal::ZERO,
            status: PositionStatus::Open,
            trail_stop_price: None,
            trail_activation_price: None,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.wallet.clone(), self.mint.clone())
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Compact view emitted to reporting collaborators.
    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            status: self.status,
            size_remaining: self.size_remaining,
            realized_pnl: self.realized_pnl,
            trail_stop_price: self.trail_stop_price,
        }
    }
}

/// Point-in-time view of a position for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Lifecycle state.
    pub status: PositionStatus,
    /// Unsold size, in atomic units.
    pub size_remaining: u64,
    /// Realized P&L in quote units.
    pub realized_pnl: Decimal,
    /// Trailing stop level, once armed.
    pub trail_stop_price: Option<Price>,
}
