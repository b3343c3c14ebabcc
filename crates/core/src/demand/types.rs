use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{ProductId, Trend, UnitId};

pub const DEFAULT_HISTORY_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_FORECAST_HORIZON_DAYS: u32 = 7;
pub const MAX_FORECAST_HORIZON_DAYS: u32 = 365;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandInput {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    #[serde(default = "default_history_window")]
    pub history_window_days: u32,
    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon_days: u32,
}

impl DemandInput {
    pub fn new(product_id: impl Into<ProductId>, unit_id: impl Into<UnitId>) -> Self {
        Self {
            product_id: product_id.into(),
            unit_id: unit_id.into(),
            history_window_days: DEFAULT_HISTORY_WINDOW_DAYS,
            forecast_horizon_days: DEFAULT_FORECAST_HORIZON_DAYS,
        }
    }

    pub fn with_history_window(mut self, days: u32) -> Self {
        self.history_window_days = days;
        self
    }

    pub fn with_horizon(mut self, days: u32) -> Self {
        self.forecast_horizon_days = days;
        self
    }
}

fn default_history_window() -> u32 {
    DEFAULT_HISTORY_WINDOW_DAYS
}

fn default_forecast_horizon() -> u32 {
    DEFAULT_FORECAST_HORIZON_DAYS
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub min: u32,
    pub max: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub expected_qty: u32,
    pub confidence_interval: ConfidenceInterval,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub score: f64,
    /// Always empty: peak detection is not implemented.
    pub peaks: Vec<NaiveDate>,
    /// Always empty: trough detection is not implemented.
    pub troughs: Vec<NaiveDate>,
    /// Weekday multiplier keyed by days from Sunday (0 = Sunday).
    pub weekly_pattern: BTreeMap<u32, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandMetrics {
    pub mean_daily: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    pub total_forecast: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandForecast {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub daily_forecasts: Vec<DailyForecast>,
    pub confidence: f64,
    pub trend: Trend,
    pub seasonality: Seasonality,
    pub metrics: DemandMetrics,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}
