use serde::{Deserialize, Serialize};

use crate::domain::{MarketId, ProductId, UnitId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub product_id: ProductId,
    #[serde(default)]
    pub unit_id: Option<UnitId>,
    #[serde(default)]
    pub market_id: Option<MarketId>,
    /// Required at analysis time; a missing or non-positive price fails the call.
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
}

impl PricingInput {
    pub fn new(product_id: impl Into<ProductId>, current_price: f64) -> Self {
        Self {
            product_id: product_id.into(),
            unit_id: None,
            market_id: None,
            current_price: Some(current_price),
            cost: None,
        }
    }

    pub fn with_unit(mut self, unit_id: impl Into<UnitId>) -> Self {
        self.unit_id = Some(unit_id.into());
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketPosition {
    Cheaper,
    Competitive,
    MoreExpensive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingActionType {
    Raise,
    Lower,
    Hold,
    Promote,
}

impl PricingActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raise => "RAISE",
            Self::Lower => "LOWER",
            Self::Hold => "HOLD",
            Self::Promote => "PROMOTE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
}

/// Percentage changes expected from moving to the optimal price.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceImpact {
    pub price_pct: f64,
    pub sales_pct: f64,
    pub revenue_pct: f64,
    pub margin_pct: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Competitiveness {
    pub position: MarketPosition,
    pub avg_diff_pct: f64,
    pub market_price: f64,
    /// 1 is the cheapest, 5 the most expensive.
    pub rank: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingAction {
    #[serde(rename = "type")]
    pub action_type: PricingActionType,
    pub suggested_price: f64,
    pub rationale: String,
    pub expected_impact: String,
    pub priority: ActionPriority,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingRecommendation {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    pub elasticity: f64,
    pub optimal_price: f64,
    pub impact: PriceImpact,
    pub competitiveness: Competitiveness,
    pub actions: Vec<PricingAction>,
}
