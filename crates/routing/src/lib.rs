//! Liquidity source routing for the copytrade execution engine.
//!
//! This crate selects best execution among competing liquidity venues:
//! - The `QuoteSource` capability every venue implements
//! - Local constant-product calculators (no network round-trip)
//! - Remote aggregator adapters (network round-trip, may fail or time out)
//! - The router that fans out, compares, and picks the winning route
//!
//! Per-source failures are isolated: a failing or slow source is excluded
//! from the comparison, never aborts it.

/// Remote aggregator adapter.
pub mod aggregator;
/// Local constant-product quote source.
pub mod local;
/// Fan-out router and best-route selection.
pub mod router;
/// Quote source capability.
pub mod source;

pub use aggregator::{AggregatorConfig, AggregatorSource};
pub use local::LocalPoolSource;
pub use router::{QuoteRouter, RouterConfig};
pub use source::QuoteSource;
