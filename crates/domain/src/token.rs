use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token mint address. Opaque to the engine; chain-specific key handling
/// belongs to the ingestion and signing collaborators.
pub type Mint = String;

/// An asset quantity in atomic (smallest) units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenAmount(pub U256);

impl TokenAmount {
    pub fn new(amount: impl Into<U256>) -> Self {
        Self(amount.into())
    }

    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Truncating view for callers that bound their amounts to u64.
    pub fn as_u64(&self) -> u64 {
        self.0.low_u64()
    }
}

impl From<u64> for TokenAmount {
    fn from(v: u64) -> Self {
        Self(U256::from(v))
    }
}

impl From<u128> for TokenAmount {
    fn from(v: u128) -> Self {
        Self(U256::from(v))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A price expressed in quote units per atomic unit of the base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(pub Decimal);

impl Price {
    pub fn new(price: Decimal) -> Self {
        Self(price)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
