use serde::{Deserialize, Serialize};

use crate::domain::{MarketId, ProductId, UnitId};

fn default_quantity() -> u32 {
    1
}

fn enabled() -> bool {
    true
}

/// One line of a shopping list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

impl ProductRequest {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self { product_id: None, name: name.into(), category: None, quantity, max_price: None }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_max_price(mut self, max_price: f64) -> Self {
        self.max_price = Some(max_price);
        self
    }

    /// Upper price bound, ignoring non-positive values.
    pub fn price_ceiling(&self) -> Option<f64> {
        self.max_price.filter(|price| *price > 0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub prefers_lower_price: bool,
    pub prefers_shorter_distance: bool,
    pub preferred_brands: Vec<String>,
    pub avoided_brands: Vec<String>,
    pub avoided_categories: Vec<String>,
    pub wants_healthy: bool,
    /// Hard price cap applied to every candidate on top of per-request limits.
    pub max_price_per_item: Option<f64>,
    #[serde(default = "enabled")]
    pub accepts_substitutes: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            prefers_lower_price: true,
            prefers_shorter_distance: false,
            preferred_brands: Vec::new(),
            avoided_brands: Vec::new(),
            avoided_categories: Vec::new(),
            wants_healthy: false,
            max_price_per_item: None,
            accepts_substitutes: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserHistory {
    pub frequent_brands: Vec<String>,
    pub frequent_categories: Vec<String>,
    pub average_spend: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shopping_list_id: Option<String>,
    /// Catalog to search; the configured default market when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_id: Option<MarketId>,
    pub products: Vec<ProductRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<UserPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<UserHistory>,
}

impl RecommendationInput {
    pub fn new(products: Vec<ProductRequest>) -> Self {
        Self {
            shopping_list_id: None,
            market_id: None,
            products,
            location: None,
            preferences: None,
            history: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationType {
    Substitute,
    Complementary,
    Promotion,
    BestPrice,
    Healthier,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

impl RecommendationPriority {
    pub fn from_total(total: u8) -> Self {
        if total >= 80 {
            Self::High
        } else if total >= 60 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Sort rank, highest priority first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// Per-criterion scores on a 0-100 scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationScores {
    pub cost_benefit: u8,
    pub compatibility: u8,
    pub stock: u8,
    pub health: u8,
    pub preference: u8,
    pub total: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<u32>,
    pub organic: bool,
    pub whole_grain: bool,
    pub gluten_free: bool,
    pub lactose_free: bool,
    pub vegan: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRecommendation {
    pub original_query: String,
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    pub suggested_unit: UnitId,
    pub unit_name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    pub savings_value: f64,
    pub savings_pct: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub stock_qty: u32,
    pub brand: String,
    pub category: String,
    pub scores: RecommendationScores,
    pub health_attributes: HealthAttributes,
    pub justifications: Vec<String>,
    pub confidence: f64,
    pub priority: RecommendationPriority,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub address: String,
    pub products: Vec<ProductRecommendation>,
    pub order: u32,
    pub distance_km: f64,
    pub eta_minutes: u32,
    pub cumulative_savings: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteOptimization {
    pub stops: Vec<RouteStop>,
    pub total_distance_km: f64,
    pub total_eta_minutes: u32,
    pub total_savings: f64,
    /// Savings per kilometre travelled.
    pub efficiency: f64,
    pub is_optimized: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSummary {
    pub requested_count: usize,
    pub recommendation_count: usize,
    pub total_savings: f64,
    pub average_savings: f64,
    pub average_health_score: u32,
    pub average_cost_benefit_score: u32,
    pub out_of_stock_count: usize,
    pub substitute_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationOutput {
    pub recommendations: Vec<ProductRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteOptimization>,
    pub estimated_savings: f64,
    pub estimated_time_minutes: u32,
    pub summary: RecommendationSummary,
}
