//! Market context snapshots consumed from upstream feeds.

use crate::token::{Mint, Price};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Live market state for one mint, as delivered by the ingestion
/// collaborators. The engine only reads these; producing them is external.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    /// Token mint the context describes.
    pub mint: Mint,
    /// Last traded price.
    pub price: Price,
    /// Realized volatility over the feed's measurement window.
    pub realized_volatility: Decimal,
    /// Current volume relative to its trailing baseline.
    pub volume_ratio: Decimal,
    /// When the snapshot was taken.
    pub observed_at: DateTime<Utc>,
}

impl MarketContext {
    pub fn new(
        mint: impl Into<Mint>,
        price: Price,
        realized_volatility: Decimal,
        volume_ratio: Decimal,
    ) -> Self {
        Self {
            mint: mint.into(),
            price,
            realized_volatility,
            volume_ratio,
            observed_at: Utc::now(),
        }
    }
}
