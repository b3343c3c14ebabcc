use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;

use crate::domain::{
    MovementKind, ProductCorrelation, ProductId, SalesRecord, StockMovement, Trend, UnitId,
};
use crate::errors::{ApplicationError, DomainError};
use crate::ports::{SalesRepository, StockRepository};
use crate::telemetry::Telemetry;

const SERVICE_NAME: &str = "SalesDataService";
const STOCK_SERVICE_NAME: &str = "StockDataService";

pub const DEFAULT_ELASTICITY: f64 = -1.2;
pub const ELASTICITY_BOUNDS: (f64, f64) = (-3.0, -0.1);
const ELASTICITY_BUCKET_DAYS: usize = 7;
const MIN_PRICE_CHANGE_PCT: f64 = 1.0;

/// Read-side analytics over the sales history port.
#[derive(Clone)]
pub struct SalesDataService {
    sales: Arc<dyn SalesRepository>,
    telemetry: Telemetry,
}

impl SalesDataService {
    pub fn new(sales: Arc<dyn SalesRepository>, telemetry: Telemetry) -> Self {
        Self { sales, telemetry }
    }

    pub async fn sales_history(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<Vec<SalesRecord>, ApplicationError> {
        self.sales.sales_history(product_id, unit_id, days).await
    }

    pub async fn average_daily_sales(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<f64, ApplicationError> {
        let history = self.sales.sales_history(product_id, unit_id, days).await?;
        let average = mean(history.iter().map(|record| record.quantity));

        self.telemetry.logs().debug(
            SERVICE_NAME,
            "average daily sales computed",
            json!({ "product_id": product_id, "unit_id": unit_id, "average": average }),
        );
        Ok(average)
    }

    pub async fn sales_trend(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<Trend, ApplicationError> {
        let history = self.sales.sales_history(product_id, unit_id, days).await?;
        let trend = history_trend(&history);

        self.telemetry.logs().debug(
            SERVICE_NAME,
            "sales trend identified",
            json!({ "product_id": product_id, "unit_id": unit_id, "trend": trend }),
        );
        Ok(trend)
    }

    /// Elasticity estimated from observed weekly price and volume changes.
    ///
    /// This is the history-based estimator; the pricing engine's live path draws its
    /// elasticity independently.
    pub async fn price_elasticity(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<f64, ApplicationError> {
        let history = self.sales.sales_history(product_id, unit_id, days).await?;
        let estimate = estimate_elasticity(&history);

        match estimate.valid_periods {
            0 => self.telemetry.logs().warn(
                SERVICE_NAME,
                "no usable price variation in history, using default elasticity",
                json!({ "product_id": product_id, "unit_id": unit_id }),
            ),
            periods => self.telemetry.logs().debug(
                SERVICE_NAME,
                "price elasticity estimated",
                json!({
                    "product_id": product_id,
                    "unit_id": unit_id,
                    "elasticity": estimate.elasticity,
                    "valid_periods": periods,
                }),
            ),
        }
        Ok(estimate.elasticity)
    }

    /// Products sold on the same days as `product_id` at the unit, strongest first.
    pub async fn correlated_products(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
        limit: usize,
    ) -> Result<Vec<ProductCorrelation>, ApplicationError> {
        let selling = self.sales.selling_days(unit_id, days).await?;
        let correlated = correlate(product_id, &selling, limit);

        self.telemetry.logs().debug(
            SERVICE_NAME,
            "correlated products computed",
            json!({ "product_id": product_id, "unit_id": unit_id, "count": correlated.len() }),
        );
        Ok(correlated)
    }

    /// Average, trend, elasticity and correlations over one window, reading the
    /// history once.
    pub async fn insights(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
        limit: usize,
    ) -> Result<SalesInsights, ApplicationError> {
        if days == 0 {
            return Err(DomainError::InvalidInput("days must be greater than zero".to_string()).into());
        }

        let history = self.sales.sales_history(product_id, unit_id, days).await?;
        let correlated_products = self.correlated_products(product_id, unit_id, days, limit).await?;
        let insights = SalesInsights {
            product_id: product_id.clone(),
            unit_id: unit_id.clone(),
            window_days: days,
            average_daily_sales: round2(mean(history.iter().map(|record| record.quantity))),
            trend: history_trend(&history),
            elasticity: estimate_elasticity(&history),
            correlated_products,
        };

        self.telemetry.logs().info(
            SERVICE_NAME,
            "sales insights computed",
            json!({
                "product_id": product_id,
                "unit_id": unit_id,
                "days": days,
                "trend": insights.trend,
            }),
        );
        Ok(insights)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SalesInsights {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub window_days: u32,
    pub average_daily_sales: f64,
    pub trend: Trend,
    pub elasticity: ElasticityEstimate,
    pub correlated_products: Vec<ProductCorrelation>,
}

/// Read-side view over the stock movement port.
#[derive(Clone)]
pub struct StockDataService {
    stock: Arc<dyn StockRepository>,
    telemetry: Telemetry,
}

impl StockDataService {
    pub fn new(stock: Arc<dyn StockRepository>, telemetry: Telemetry) -> Self {
        Self { stock, telemetry }
    }

    pub async fn stock_history(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<StockHistory, ApplicationError> {
        if days == 0 {
            return Err(DomainError::InvalidInput("days must be greater than zero".to_string()).into());
        }

        let movements = self.stock.stock_movements(product_id, unit_id, days).await?;
        let history = StockHistory::new(product_id.clone(), unit_id.clone(), days, movements);

        self.telemetry.logs().debug(
            STOCK_SERVICE_NAME,
            "stock history loaded",
            json!({
                "product_id": product_id,
                "unit_id": unit_id,
                "movements": history.movements.len(),
                "net_change": history.net_change,
            }),
        );
        Ok(history)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StockHistory {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub window_days: u32,
    pub movements: Vec<StockMovement>,
    pub inbound_units: u64,
    pub outbound_units: u64,
    pub net_change: i64,
}

impl StockHistory {
    pub fn new(
        product_id: ProductId,
        unit_id: UnitId,
        window_days: u32,
        movements: Vec<StockMovement>,
    ) -> Self {
        let total = |kind: MovementKind| -> u64 {
            movements
                .iter()
                .filter(|movement| movement.kind == kind)
                .map(|movement| u64::from(movement.quantity))
                .sum()
        };
        let inbound_units = total(MovementKind::Inbound);
        let outbound_units = total(MovementKind::Outbound);
        let net_change = i64::try_from(inbound_units).unwrap_or(i64::MAX)
            - i64::try_from(outbound_units).unwrap_or(i64::MAX);

        Self { product_id, unit_id, window_days, movements, inbound_units, outbound_units, net_change }
    }
}

/// Confidence is the share of the product's selling days on which the other product
/// also sold. Ties break on product id. Empty when the product never sold.
pub fn correlate(
    product_id: &ProductId,
    selling: &BTreeMap<ProductId, BTreeSet<NaiveDate>>,
    limit: usize,
) -> Vec<ProductCorrelation> {
    let Some(target) = selling.get(product_id).filter(|days| !days.is_empty()) else {
        return Vec::new();
    };

    let mut correlated: Vec<ProductCorrelation> = selling
        .iter()
        .filter(|(other, _)| *other != product_id)
        .filter_map(|(other, days)| {
            let shared = target.intersection(days).count();
            (shared > 0).then(|| ProductCorrelation {
                product_id: other.clone(),
                shared_days: u32::try_from(shared).unwrap_or(u32::MAX),
                confidence: round2(shared as f64 / target.len() as f64),
            })
        })
        .collect();

    // stable, so ties keep the map's id order
    correlated.sort_by(|left, right| right.shared_days.cmp(&left.shared_days));
    correlated.truncate(limit);
    correlated
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ElasticityEstimate {
    pub elasticity: f64,
    pub valid_periods: usize,
}

/// Halves comparison with a 15% band. Fewer than seven records is always stable.
pub fn history_trend(history: &[SalesRecord]) -> Trend {
    if history.len() < 7 {
        return Trend::Stable;
    }

    let mid = history.len() / 2;
    let first = mean(history[..mid].iter().map(|record| record.quantity));
    let second = mean(history[mid..].iter().map(|record| record.quantity));

    if second > first * 1.15 {
        Trend::Rising
    } else if second < first * 0.85 {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

pub fn estimate_elasticity(history: &[SalesRecord]) -> ElasticityEstimate {
    let buckets: Vec<(f64, f64)> = history
        .chunks(ELASTICITY_BUCKET_DAYS)
        .map(|bucket| {
            let quantity: f64 = bucket.iter().map(|record| record.quantity).sum();
            let revenue: f64 = bucket.iter().map(|record| record.revenue).sum();
            (quantity, revenue)
        })
        .collect();

    let ratios: Vec<f64> = buckets
        .windows(2)
        .filter_map(|pair| {
            let (previous_qty, previous_revenue) = pair[0];
            let (current_qty, current_revenue) = pair[1];
            if previous_qty <= 0.0 || current_qty <= 0.0 {
                return None;
            }

            let previous_price = previous_revenue / previous_qty;
            let current_price = current_revenue / current_qty;
            if previous_price <= 0.0 {
                return None;
            }

            let price_change = (current_price - previous_price) / previous_price * 100.0;
            if price_change.abs() < MIN_PRICE_CHANGE_PCT {
                return None;
            }

            let quantity_change = (current_qty - previous_qty) / previous_qty * 100.0;
            Some(quantity_change / price_change)
        })
        .collect();

    if ratios.is_empty() {
        return ElasticityEstimate { elasticity: DEFAULT_ELASTICITY, valid_periods: 0 };
    }

    let (lower, upper) = ELASTICITY_BOUNDS;
    let average = ratios.iter().sum::<f64>() / ratios.len() as f64;
    ElasticityEstimate { elasticity: average.clamp(lower, upper), valid_periods: ratios.len() }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
