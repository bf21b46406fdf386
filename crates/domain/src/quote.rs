//! Quotes and route candidates.

use crate::token::{Mint, TokenAmount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One liquidity source's answer for a requested swap. Produced fresh per
/// request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Input mint.
    pub mint_in: Mint,
    /// Output mint.
    pub mint_out: Mint,
    /// Input amount in atomic units.
    pub amount_in: TokenAmount,
    /// Output amount in atomic units.
    pub amount_out: TokenAmount,
    /// Estimated price impact in basis points.
    pub price_impact_bps: u32,
    /// Fee taken by the venue, in atomic units of the input.
    pub fee_atomic: TokenAmount,
}

/// The selected best quote among competing liquidity sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCandidate {
    /// Name of the winning source.
    pub source_name: String,
    /// The winning quote.
    pub quote: Quote,
}

impl RouteCandidate {
    pub fn new(source_name: impl Into<String>, quote: Quote) -> Self {
        Self {
            source_name: source_name.into(),
            quote,
        }
    }

    pub fn amount_out(&self) -> TokenAmount {
        self.quote.amount_out
    }
}

/// One row of the ranked route comparison, for operator inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteComparison {
    /// Source name.
    pub source_name: String,
    /// Quoted output in atomic units.
    pub amount_out: TokenAmount,
    /// Estimated price impact in basis points.
    pub price_impact_bps: u32,
}

impl fmt::Display for RouteComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: out={} impact={}bps",
            self.source_name, self.amount_out, self.price_impact_bps
        )
    }
}
