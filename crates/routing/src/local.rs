//! Local constant-product quote source.

use crate::source::QuoteSource;
use async_trait::async_trait;
use copytrade_domain::math::{get_amount_out, price_impact_bps};
use copytrade_domain::{EngineError, Quote, TokenAmount};
use primitive_types::U256;
use tokio::sync::RwLock;
use tracing::trace;

const BPS_DENOMINATOR: u32 = 10_000;

/// Reserve state for one two-sided pool.
#[derive(Debug, Clone, Copy)]
struct Reserves {
    reserve_a: TokenAmount,
    reserve_b: TokenAmount,
}

/// Quote source backed by locally held pool reserves.
///
/// No network round-trip: quotes come straight from the constant-product
/// formula against the last reserve state pushed by the ingestion
/// collaborators.
pub struct LocalPoolSource {
    name: String,
    mint_a: String,
    mint_b: String,
    fee_bps: u32,
    reserves: RwLock<Reserves>,
}

impl LocalPoolSource {
    pub fn new(
        name: impl Into<String>,
        mint_a: impl Into<String>,
        mint_b: impl Into<String>,
        reserve_a: TokenAmount,
        reserve_b: TokenAmount,
        fee_bps: u32,
    ) -> Self {
        Self {
            name: name.into(),
            mint_a: mint_a.into(),
            mint_b: mint_b.into(),
            fee_bps,
            reserves: RwLock::new(Reserves {
                reserve_a,
                reserve_b,
            }),
        }
    }

    /// Replaces the pool state with a fresh snapshot.
    pub async fn set_reserves(&self, reserve_a: TokenAmount, reserve_b: TokenAmount) {
        let mut reserves = self.reserves.write().await;
        reserves.reserve_a = reserve_a;
        reserves.reserve_b = reserve_b;
        trace!(pool = %self.name, %reserve_a, %reserve_b, "reserves updated");
    }

    /// Orients the reserves for the requested direction.
    fn oriented(
        &self,
        mint_in: &str,
        mint_out: &str,
        reserves: Reserves,
    ) -> Result<(TokenAmount, TokenAmount), EngineError> {
        if mint_in == self.mint_a && mint_out == self.mint_b {
            Ok((reserves.reserve_a, reserves.reserve_b))
        } else if mint_in == self.mint_b && mint_out == self.mint_a {
            Ok((reserves.reserve_b, reserves.reserve_a))
        } else {
            Err(EngineError::QuoteSourceFailure {
                source: self.name.clone(),
                message: format!("pool does not trade {mint_in} -> {mint_out}"),
            })
        }
    }
}

#[async_trait]
impl QuoteSource for LocalPoolSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_quote(
        &self,
        mint_in: &str,
        mint_out: &str,
        amount_in: TokenAmount,
    ) -> Result<Quote, EngineError> {
        let reserves = *self.reserves.read().await;
        let (reserve_in, reserve_out) = self.oriented(mint_in, mint_out, reserves)?;

        let amount_out = get_amount_out(amount_in, reserve_in, reserve_out, self.fee_bps)?;
        let impact = price_impact_bps(amount_in, reserve_in, reserve_out, self.fee_bps)?;
        let fee_atomic =
            TokenAmount(amount_in.0 * U256::from(self.fee_bps) / U256::from(BPS_DENOMINATOR));

        Ok(Quote {
            mint_in: mint_in.to_string(),
            mint_out: mint_out.to_string(),
            amount_in,
            amount_out,
            price_impact_bps: impact,
            fee_atomic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> LocalPoolSource {
        LocalPoolSource::new(
            "local-amm",
            "SOL",
            "USDC",
            TokenAmount::from(1_000u64),
            TokenAmount::from(1_000u64),
            30,
        )
    }

    #[tokio::test]
    async fn test_quote_matches_formula() {
        let source = pool();
        let quote = source
            .get_quote("SOL", "USDC", TokenAmount::from(10u64))
            .await
            .unwrap();

        assert_eq!(quote.amount_out.as_u64(), 9);
        assert_eq!(quote.fee_atomic.as_u64(), 0);
    }

    #[tokio::test]
    async fn test_reverse_direction() {
        let source = LocalPoolSource::new(
            "local-amm",
            "SOL",
            "USDC",
            TokenAmount::from(1_000u64),
            TokenAmount::from(4_000u64),
            0,
        );

        let forward = source
            .get_quote("SOL", "USDC", TokenAmount::from(100u64))
            .await
            .unwrap();
        let reverse = source
            .get_quote("USDC", "SOL", TokenAmount::from(100u64))
            .await
            .unwrap();

        // 4:1 price one way, 1:4 the other.
        assert!(forward.amount_out.as_u64() > reverse.amount_out.as_u64());
    }

    #[tokio::test]
    async fn test_unknown_pair_is_source_failure() {
        let source = pool();
        let err = source
            .get_quote("SOL", "BONK", TokenAmount::from(10u64))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::QuoteSourceFailure { .. }));
    }

    #[tokio::test]
    async fn test_drained_pool_is_invalid() {
        let source = pool();
        source
            .set_reserves(TokenAmount::zero(), TokenAmount::from(1_000u64))
            .await;

        let err = source
            .get_quote("SOL", "USDC", TokenAmount::from(10u64))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidPool(_)));
    }
}
