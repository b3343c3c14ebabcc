//! Pricing engine
//!
//! Synthetic elasticity and market-price draws around the current price produce an
//! optimal price, its expected impact and a single raise/lower action.

mod calculator;
mod engine;
mod types;

pub use calculator::{market_position, price_impact, PricingCalculator};
pub use engine::SmartPricingEngine;
pub use types::*;

pub const ENGINE_NAME: &str = "SmartPricingEngine";
pub const ENGINE_VERSION: &str = "1.0.0-mock";
