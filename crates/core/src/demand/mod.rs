//! Demand forecasting engine
//!
//! Moving-average forecast over a product's daily sales history, with a weekday
//! multiplier table, a bounded random perturbation and a heuristic confidence score.

mod calculator;
mod predictor;
mod types;

pub use calculator::DemandCalculator;
pub use predictor::{summarize_batch, DemandPredictor};
pub use types::*;

pub const ENGINE_NAME: &str = "DemandPredictor";
pub const ENGINE_VERSION: &str = "1.0.0-mock";
