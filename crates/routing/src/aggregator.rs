//! Remote aggregator quote adapter.

use crate::source::QuoteSource;
use async_trait::async_trait;
use copytrade_domain::{EngineError, Quote, TokenAmount};
use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

/// Configuration for a remote aggregator endpoint.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Base URL of the quote API.
    pub base_url: String,
    /// Slippage tolerance requested from the aggregator, in basis points.
    pub slippage_bps: u16,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://quote-api.jup.ag/v6".to_string(),
            slippage_bps: 50, // 0.5%
        }
    }
}

/// Wire shape of the aggregator's quote response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    input_mint: String,
    output_mint: String,
    in_amount: String,
    out_amount: String,
    /// Price impact as a percentage, e.g. "0.05" for 5 bps.
    price_impact_pct: String,
    /// Total venue fee in atomic units of the input, when reported.
    #[serde(default)]
    fee_amount: Option<String>,
}

/// Adapter over a Jupiter-style aggregator quote REST API.
///
/// Network failures, non-success statuses and malformed payloads all
/// surface as per-source failures for the router to isolate.
pub struct AggregatorSource {
    name: String,
    config: AggregatorConfig,
    client: reqwest::Client,
}

impl AggregatorSource {
    pub fn new(name: impl Into<String>, config: AggregatorConfig) -> Self {
        Self {
            name: name.into(),
            config,
            client: reqwest::Client::new(),
        }
    }

    fn failure(&self, message: impl Into<String>) -> EngineError {
        EngineError::QuoteSourceFailure {
            source: self.name.clone(),
            message: message.into(),
        }
    }

    fn parse_amount(&self, field: &str, raw: &str) -> Result<TokenAmount, EngineError> {
        U256::from_dec_str(raw)
            .map(TokenAmount)
            .map_err(|_| self.failure(format!("unparseable {field}: {raw:?}")))
    }

    fn into_quote(&self, response: QuoteResponse) -> Result<Quote, EngineError> {
        let amount_in = self.parse_amount("inAmount", &response.in_amount)?;
        let amount_out = self.parse_amount("outAmount", &response.out_amount)?;
        let fee_atomic = match &response.fee_amount {
            Some(raw) => self.parse_amount("feeAmount", raw)?,
            None => TokenAmount::zero(),
        };

        let impact_pct = Decimal::from_str(&response.price_impact_pct)
            .map_err(|_| self.failure("unparseable priceImpactPct"))?;
        let price_impact_bps = (impact_pct * Decimal::from(100)).round().to_u32().unwrap_or(0);

        Ok(Quote {
            mint_in: response.input_mint,
            mint_out: response.output_mint,
            amount_in,
            amount_out,
            price_impact_bps,
            fee_atomic,
        })
    }
}

#[async_trait]
impl QuoteSource for AggregatorSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_quote(
        &self,
        mint_in: &str,
        mint_out: &str,
        amount_in: TokenAmount,
    ) -> Result<Quote, EngineError> {
        let url = format!("{}/quote", self.config.base_url);
        debug!(source = %self.name, mint_in, mint_out, %amount_in, "requesting aggregator quote");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", mint_in),
                ("outputMint", mint_out),
                ("amount", &amount_in.to_string()),
                ("slippageBps", &self.config.slippage_bps.to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.failure(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(self.failure(format!("status {}", response.status())));
        }

        let payload: QuoteResponse = response
            .json()
            .await
            .map_err(|e| self.failure(format!("decode failed: {e}")))?;

        self.into_quote(payload)
    }
}
