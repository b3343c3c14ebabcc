use serde::{Deserialize, Serialize};

use crate::domain::{MarketId, StockAlert, UnitId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHealthInput {
    pub unit_id: UnitId,
    pub market_id: MarketId,
    /// Restricts the analysis to these categories when non-empty.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Accepted for compatibility; the stock port only yields available rows.
    #[serde(default)]
    pub include_inactive: bool,
}

impl StockHealthInput {
    pub fn new(unit_id: impl Into<UnitId>, market_id: impl Into<MarketId>) -> Self {
        Self {
            unit_id: unit_id.into(),
            market_id: market_id.into(),
            categories: Vec::new(),
            include_inactive: false,
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Critical,
    Warning,
    Healthy,
    Optimal,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score < 50.0 {
            Self::Critical
        } else if score < 70.0 {
            Self::Warning
        } else if score < 90.0 {
            Self::Healthy
        } else {
            Self::Optimal
        }
    }

    /// Status of a category from the share of its products carrying an alert.
    pub fn from_alert_ratio(ratio: f64) -> Self {
        if ratio > 0.3 {
            Self::Critical
        } else if ratio > 0.15 {
            Self::Warning
        } else if ratio > 0.05 {
            Self::Healthy
        } else {
            Self::Optimal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
            Self::Healthy => "HEALTHY",
            Self::Optimal => "OPTIMAL",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcSplit {
    #[serde(rename = "A")]
    pub a: usize,
    #[serde(rename = "B")]
    pub b: usize,
    #[serde(rename = "C")]
    pub c: usize,
}

impl AbcSplit {
    /// Fixed 20/30/50 rank cut over `total` products ranked by descending quantity.
    pub fn by_rank(total: usize) -> Self {
        let a_end = total / 5;
        let b_end = total / 2;
        Self { a: a_end, b: b_end - a_end, c: total - b_end }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockMetrics {
    pub total_products: usize,
    pub total_quantity: u64,
    /// Unit-level monthly turnover; categories carry their own in the breakdown.
    pub turnover: f64,
    pub rupture_rate: f64,
    pub inventory_value: f64,
    pub coverage_days: f64,
    pub active_count: usize,
    pub at_risk_count: usize,
    pub stalled_count: usize,
    pub optimal_count: usize,
    pub abc_split: AbcSplit,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryAnalysis {
    pub category: String,
    pub product_count: usize,
    pub inventory_value: f64,
    pub turnover: f64,
    pub status: HealthStatus,
    pub alerted_products: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockHealthReport {
    pub unit_id: UnitId,
    pub score: f64,
    pub status: HealthStatus,
    pub alerts: Vec<StockAlert>,
    pub metrics: StockMetrics,
    pub recommendations: Vec<String>,
    pub category_breakdown: Vec<CategoryAnalysis>,
}
