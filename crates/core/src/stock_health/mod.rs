//! Stock health engine
//!
//! Threshold rules over a unit's stock snapshot produce alerts, a 0-100 health score
//! and per-category rollups. The engine persists the leading alerts for the unit.

mod analyzer;
mod engine;
mod types;

pub use analyzer::StockHealthAnalyzer;
pub use engine::StockHealthEngine;
pub use types::*;

pub const ENGINE_NAME: &str = "StockHealthEngine";
pub const ENGINE_VERSION: &str = "1.0.0";

/// Quantity below which a product is at risk of rupture.
pub const RUPTURE_THRESHOLD: u32 = 10;
/// Quantity above which stock counts as excess.
pub const EXCESS_THRESHOLD: u32 = 200;
/// Quantity above which (up to the excess threshold) turnover counts as low.
pub const LOW_TURNOVER_THRESHOLD: u32 = 150;

/// Monthly category turnover used when sales data is missing.
pub const DEFAULT_CATEGORY_TURNOVER: f64 = 4.0;
/// Monthly category turnover used when the sales lookup fails.
pub const FAILED_LOOKUP_TURNOVER: f64 = 2.0;
pub const MAX_CATEGORY_TURNOVER: f64 = 10.0;
pub const TURNOVER_WINDOW_DAYS: u32 = 30;

pub const UNCATEGORIZED: &str = "Uncategorized";
