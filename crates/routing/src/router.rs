//! Fan-out router over registered quote sources.

use crate::source::QuoteSource;
use copytrade_domain::{EngineError, Quote, RouteCandidate, RouteComparison, TokenAmount};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Configuration for the quote router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Per-source quote deadline. A source that misses it is excluded
    /// from the comparison, exactly like a failing one.
    pub quote_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            quote_timeout: Duration::from_secs(2),
        }
    }
}

/// Selects best execution among registered liquidity sources.
///
/// Registration order is preserved and is the deterministic tie-break:
/// on exactly equal output the earliest-registered source wins.
pub struct QuoteRouter {
    sources: Vec<Arc<dyn QuoteSource>>,
    config: RouterConfig,
}

impl QuoteRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            sources: Vec::new(),
            config,
        }
    }

    /// Adds a source to the registry.
    pub fn register_source(&mut self, source: Arc<dyn QuoteSource>) {
        debug!(source = source.name(), "registering quote source");
        self.sources.push(source);
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Queries every registered source concurrently, each under its own
    /// deadline. Failures and timeouts are logged and omitted; the sweep
    /// itself never fails. Results come back in registration order.
    pub async fn get_all_quotes(
        &self,
        mint_in: &str,
        mint_out: &str,
        amount_in: TokenAmount,
    ) -> Vec<(String, Quote)> {
        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = source.clone();
            let mint_in = mint_in.to_string();
            let mint_out = mint_out.to_string();
            let deadline = self.config.quote_timeout;

            tasks.spawn(async move {
                let result = timeout(deadline, source.get_quote(&mint_in, &mint_out, amount_in)).await;
                (index, source.name().to_string(), result)
            });
        }

        let mut slots: Vec<Option<(String, Quote)>> = vec![None; self.sources.len()];
        while let Some(joined) = tasks.join_next().await {
            let Ok((index, name, result)) = joined else {
                warn!("quote task panicked");
                continue;
            };
            match result {
                Ok(Ok(quote)) => {
                    slots[index] = Some((name, quote));
                }
                Ok(Err(e)) => {
                    warn!(source = %name, error = %e, "quote source failed");
                }
                Err(_) => {
                    warn!(source = %name, timeout = ?self.config.quote_timeout, "quote source timed out");
                }
            }
        }

        slots.into_iter().flatten().collect()
    }

    /// Returns the route with maximal output among the successful quotes.
    /// An empty registry, or one where every source failed, is an explicit
    /// no-route result.
    pub async fn find_best_route(
        &self,
        mint_in: &str,
        mint_out: &str,
        amount_in: TokenAmount,
    ) -> Result<RouteCandidate, EngineError> {
        let quotes = self.get_all_quotes(mint_in, mint_out, amount_in).await;

        let mut best: Option<(String, Quote)> = None;
        for (name, quote) in quotes {
            // Strict comparison: the earliest-registered source keeps ties.
            let is_better = best
                .as_ref()
                .is_none_or(|(_, current)| quote.amount_out > current.amount_out);
            if is_better {
                best = Some((name, quote));
            }
        }

        match best {
            Some((name, quote)) => {
                debug!(source = %name, amount_out = %quote.amount_out, "best route selected");
                Ok(RouteCandidate::new(name, quote))
            }
            None => Err(EngineError::NoRouteAvailable {
                mint_in: mint_in.to_string(),
                mint_out: mint_out.to_string(),
            }),
        }
    }

    /// Ranked view of all successful quotes, best output first.
    pub async fn compare_routes(
        &self,
        mint_in: &str,
        mint_out: &str,
        amount_in: TokenAmount,
    ) -> Vec<RouteComparison> {
        let mut rows: Vec<RouteComparison> = self
            .get_all_quotes(mint_in, mint_out, amount_in)
            .await
            .into_iter()
            .map(|(name, quote)| RouteComparison {
                source_name: name,
                amount_out: quote.amount_out,
                price_impact_bps: quote.price_impact_bps,
            })
            .collect();

        // Stable sort keeps registration order among equal outputs.
        rows.sort_by(|a, b| b.amount_out.cmp(&a.amount_out));
        rows
    }
}

impl Default for QuoteRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}
