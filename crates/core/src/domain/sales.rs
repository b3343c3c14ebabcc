use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ProductId;

/// Aggregated sales of one product at one unit on one calendar day.
///
/// Days without sales are represented by a zero-filled record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub quantity: f64,
    pub revenue: f64,
}

impl SalesRecord {
    pub fn new(date: NaiveDate, quantity: f64, revenue: f64) -> Self {
        Self { date, quantity, revenue }
    }

    pub fn empty(date: NaiveDate) -> Self {
        Self::new(date, 0.0, 0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Rising,
    Stable,
    Falling,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "RISING",
            Self::Stable => "STABLE",
            Self::Falling => "FALLING",
        }
    }
}

/// Another product that sells on the same days as the one asked about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductCorrelation {
    pub product_id: ProductId,
    pub shared_days: u32,
    /// Share of the product's selling days on which this one also sold, in `[0, 1]`.
    pub confidence: f64,
}
