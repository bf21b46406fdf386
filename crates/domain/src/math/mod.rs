//! Pure math for the execution core.

/// Constant-product (x*y=k) swap quoting.
pub mod constant_product;
/// Integer-exact exit sizing.
pub mod sizing;

pub use constant_product::{get_amount_out, price_impact_bps, spot_price};
pub use sizing::calculate_swap_amount;
