use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::{MarketId, ProductId, UnitId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Rupture,
    Excess,
    LowTurnover,
    StalePrice,
    Expiry,
}

impl AlertType {
    /// Alert types owned by a stock health run; a new run replaces these for the unit.
    pub const STOCK_HEALTH: [AlertType; 4] =
        [Self::Rupture, Self::Excess, Self::LowTurnover, Self::StalePrice];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rupture => "RUPTURE",
            Self::Excess => "EXCESS",
            Self::LowTurnover => "LOW_TURNOVER",
            Self::StalePrice => "STALE_PRICE",
            Self::Expiry => "EXPIRY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "RUPTURE" => Some(Self::Rupture),
            "EXCESS" => Some(Self::Excess),
            "LOW_TURNOVER" => Some(Self::LowTurnover),
            "STALE_PRICE" => Some(Self::StalePrice),
            "EXPIRY" => Some(Self::Expiry),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertPriority {
    /// Sort rank, most urgent first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertUrgency {
    Immediate,
    ShortTerm,
    MediumTerm,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub product_id: ProductId,
    pub product_name: String,
    pub category: Option<String>,
    pub description: String,
    pub current_qty: u32,
    pub recommended_qty: u32,
    pub days_to_rupture: Option<u32>,
    pub impact_value: Option<f64>,
    pub recommended_action: String,
    pub urgency: AlertUrgency,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertMetadata {
    pub current_qty: u32,
    pub recommended_qty: u32,
    pub days_to_rupture: Option<u32>,
    pub impact_value: Option<f64>,
    pub urgency: AlertUrgency,
}

/// Durable alert row written by the stock health orchestrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedAlert {
    pub id: String,
    pub market_id: MarketId,
    pub unit_id: UnitId,
    pub product_id: ProductId,
    pub alert_type: AlertType,
    pub title: String,
    pub description: String,
    pub priority: AlertPriority,
    pub recommended_action: String,
    pub action_link: String,
    pub read: bool,
    pub metadata: AlertMetadata,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PersistedAlert {
    pub fn from_stock_alert(
        id: impl Into<String>,
        market_id: MarketId,
        unit_id: UnitId,
        alert: &StockAlert,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            id: id.into(),
            market_id,
            unit_id,
            product_id: alert.product_id.clone(),
            alert_type: alert.alert_type,
            title: format!("{}: {}", alert.alert_type.as_str(), alert.product_name),
            description: alert.description.clone(),
            priority: alert.priority,
            recommended_action: alert.recommended_action.clone(),
            action_link: format!("/gestor/produtos/{}", alert.product_id),
            read: false,
            metadata: AlertMetadata {
                current_qty: alert.current_qty,
                recommended_qty: alert.recommended_qty,
                days_to_rupture: alert.days_to_rupture,
                impact_value: alert.impact_value,
                urgency: alert.urgency,
            },
            created_at,
            expires_at: created_at + ttl,
        }
    }
}
