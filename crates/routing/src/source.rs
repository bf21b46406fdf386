//! Quote source capability.

use async_trait::async_trait;
use copytrade_domain::{EngineError, Quote, TokenAmount};

/// A liquidity venue that can quote a swap.
///
/// The variant set is closed per deployment: local constant-product
/// calculators and remote aggregator adapters. The router dispatches
/// through this trait only, never by inspecting the concrete type.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Stable venue name, used for route attribution and tie-break logs.
    fn name(&self) -> &str;

    /// Quotes `amount_in` of `mint_in` into `mint_out`. A fresh quote per
    /// call; failures are per-source and isolated by the router.
    async fn get_quote(
        &self,
        mint_in: &str,
        mint_out: &str,
        amount_in: TokenAmount,
    ) -> Result<Quote, EngineError>;
}
