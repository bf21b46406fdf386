//! Constant-product (x * y = k) swap quoting with fees.

use crate::errors::EngineError;
use crate::token::TokenAmount;
use primitive_types::U256;
use rust_decimal::Decimal;

const BPS_DENOMINATOR: u32 = 10_000;

/// Calculates the output amount for a swap against a constant product pool.
///
/// formula: dy = y * dx' / (x + dx') where dx' = dx * (10000 - fee_bps) / 10000
///
/// Zero reserves cannot quote and are an invalid-pool error; a zero input
/// quotes zero output without error. Arbitrarily large inputs go through
/// the same checked integer formula.
pub fn get_amount_out(
    amount_in: TokenAmount,
    reserve_in: TokenAmount,
    reserve_out: TokenAmount,
    fee_bps: u32,
) -> Result<TokenAmount, EngineError> {
    let amount_in = amount_in.0;
    let reserve_in = reserve_in.0;
    let reserve_out = reserve_out.0;

    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(EngineError::InvalidPool(
            "reserves must be non-zero".to_string(),
        ));
    }
    if amount_in.is_zero() {
        return Ok(TokenAmount::zero());
    }

    let amount_in_with_fee = amount_in
        .checked_mul(U256::from(BPS_DENOMINATOR - fee_bps))
        .ok_or_else(overflow)?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or_else(overflow)?;
    let denominator = reserve_in
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .ok_or_else(overflow)?
        .checked_add(amount_in_with_fee)
        .ok_or_else(overflow)?;

    Ok(TokenAmount(numerator / denominator))
}

/// Estimated price impact of the swap in basis points: the shortfall of the
/// actual output against the fee-adjusted spot output.
pub fn price_impact_bps(
    amount_in: TokenAmount,
    reserve_in: TokenAmount,
    reserve_out: TokenAmount,
    fee_bps: u32,
) -> Result<u32, EngineError> {
    let actual = get_amount_out(amount_in, reserve_in, reserve_out, fee_bps)?;
    if amount_in.0.is_zero() {
        return Ok(0);
    }

    let amount_in_with_fee = amount_in
        .0
        .checked_mul(U256::from(BPS_DENOMINATOR - fee_bps))
        .ok_or_else(overflow)?;
    // Output the swap would get at spot price, fee already deducted.
    let ideal = amount_in_with_fee
        .checked_mul(reserve_out.0)
        .ok_or_else(overflow)?
        / (reserve_in
            .0
            .checked_mul(U256::from(BPS_DENOMINATOR))
            .ok_or_else(overflow)?);

    if ideal.is_zero() {
        return Ok(0);
    }

    let shortfall = ideal - actual.0;
    let impact = shortfall * U256::from(BPS_DENOMINATOR) / ideal;
    Ok(impact.low_u32())
}

/// Spot price of the input token in terms of the output token.
pub fn spot_price(
    reserve_in: TokenAmount,
    reserve_out: TokenAmount,
) -> Result<Decimal, EngineError> {
    use std::str::FromStr;

    if reserve_in.0.is_zero() || reserve_out.0.is_zero() {
        return Err(EngineError::InvalidPool(
            "reserves must be non-zero".to_string(),
        ));
    }

    let r_in = Decimal::from_str(&reserve_in.0.to_string())
        .map_err(|_| EngineError::InvalidPool("reserve exceeds decimal range".to_string()))?;
    let r_out = Decimal::from_str(&reserve_out.0.to_string())
        .map_err(|_| EngineError::InvalidPool("reserve exceeds decimal range".to_string()))?;

    Ok(r_out / r_in)
}

fn overflow() -> EngineError {
    EngineError::InvalidPool("arithmetic overflow".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_amount_out_basic() {
        // 1000/1000 reserves, 10 in, 30 bps fee:
        // amount_in_with_fee = 10 * 9970 = 99700
        // numerator = 99700 * 1000 = 99,700,000
        // denominator = 1000 * 10000 + 99700 = 10,099,700
        // out = floor(9.8715...) = 9
        let out = get_amount_out(
            TokenAmount::from(10u64),
            TokenAmount::from(1_000u64),
            TokenAmount::from(1_000u64),
            30,
        )
        .unwrap();
        assert_eq!(out.as_u64(), 9);
    }

    #[test]
    fn test_get_amount_out_deep_pool() {
        // Deep pool, small trade: out ≈ in * (1 - fee) * 2 against 1:2 reserves.
        // amount_in_with_fee = 1_000_000 * 9975 = 9_975_000_000
        // numerator = 9_975_000_000 * 20e9
        // denominator = 10e9 * 10000 + 9_975_000_000 = 100_009_975_000_000
        // out = floor(1_994_801.0...) = 1_994_801
        let out = get_amount_out(
            TokenAmount::from(1_000_000u64),
            TokenAmount::from(10_000_000_000u64),
            TokenAmount::from(20_000_000_000u64),
            25,
        )
        .unwrap();
        assert_eq!(out.as_u64(), 1_994_801);
    }

    #[test]
    fn test_zero_reserves_invalid_pool() {
        let err = get_amount_out(
            TokenAmount::from(10u64),
            TokenAmount::zero(),
            TokenAmount::from(1_000u64),
            30,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidPool(_)));

        let err = get_amount_out(
            TokenAmount::from(10u64),
            TokenAmount::from(1_000u64),
            TokenAmount::zero(),
            30,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidPool(_)));
    }

    #[test]
    fn test_zero_input_quotes_zero() {
        let out = get_amount_out(
            TokenAmount::zero(),
            TokenAmount::from(1_000u64),
            TokenAmount::from(1_000u64),
            30,
        )
        .unwrap();
        assert!(out.is_zero());
    }

    #[test]
    fn test_large_input_same_formula() {
        // Input dwarfing the pool still quotes; output stays below reserves.
        let out = get_amount_out(
            TokenAmount::from(u64::MAX),
            TokenAmount::from(1_000u64),
            TokenAmount::from(1_000u64),
            30,
        )
        .unwrap();
        assert!(out.as_u64() < 1_000);
    }

    #[test]
    fn test_price_impact_grows_with_size() {
        let reserves = TokenAmount::from(1_000_000u64);
        let small = price_impact_bps(TokenAmount::from(100u64), reserves, reserves, 30).unwrap();
        let large =
            price_impact_bps(TokenAmount::from(100_000u64), reserves, reserves, 30).unwrap();
        assert!(small < large);
        // A trade ~10% of the pool loses ~9% to impact.
        assert!(large > 800 && large < 1_000);
    }

    #[test]
    fn test_spot_price() {
        let price = spot_price(TokenAmount::from(2_000u64), TokenAmount::from(1_000u64)).unwrap();
        assert_eq!(price, Decimal::new(5, 1));
    }
}
