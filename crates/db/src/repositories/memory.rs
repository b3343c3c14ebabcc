use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use precivox_core::domain::{
    AlertType, ForecastRollup, MarketId, PersistedAlert, ProductId, ProductSnapshot, SalesRecord,
    StockMovement, UnitId,
};
use precivox_core::errors::ApplicationError;
use precivox_core::ports::{AlertRepository, SalesRepository, StockRepository};

use super::sales::zero_filled;
use super::window_start;

type DailyTotals = HashMap<NaiveDate, (f64, f64)>;

#[derive(Default)]
pub struct InMemorySalesRepository {
    sales: RwLock<HashMap<(ProductId, UnitId), DailyTotals>>,
}

impl InMemorySalesRepository {
    pub async fn record_sale(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        date: NaiveDate,
        quantity: f64,
        revenue: f64,
    ) {
        let mut sales = self.sales.write().await;
        let totals = sales.entry((product_id.clone(), unit_id.clone())).or_default();
        let entry = totals.entry(date).or_insert((0.0, 0.0));
        entry.0 += quantity;
        entry.1 += revenue;
    }

    pub async fn history_until(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
        end: NaiveDate,
    ) -> Vec<SalesRecord> {
        if days == 0 {
            return Vec::new();
        }
        let sales = self.sales.read().await;
        let empty = DailyTotals::new();
        let totals = sales.get(&(product_id.clone(), unit_id.clone())).unwrap_or(&empty);
        zero_filled(end, days, totals)
    }

    pub async fn selling_days_until(
        &self,
        unit_id: &UnitId,
        days: u32,
        end: NaiveDate,
    ) -> BTreeMap<ProductId, BTreeSet<NaiveDate>> {
        if days == 0 {
            return BTreeMap::new();
        }
        let start = window_start(end, days);
        let sales = self.sales.read().await;
        sales
            .iter()
            .filter(|((_, unit), _)| unit == unit_id)
            .filter_map(|((product_id, _), totals)| {
                let dates: BTreeSet<NaiveDate> = totals
                    .iter()
                    .filter(|(date, (quantity, _))| **date >= start && **date <= end && *quantity > 0.0)
                    .map(|(date, _)| *date)
                    .collect();
                (!dates.is_empty()).then(|| (product_id.clone(), dates))
            })
            .collect()
    }
}

#[async_trait]
impl SalesRepository for InMemorySalesRepository {
    async fn sales_history(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<Vec<SalesRecord>, ApplicationError> {
        Ok(self.history_until(product_id, unit_id, days, Utc::now().date_naive()).await)
    }

    async fn selling_days(
        &self,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<BTreeMap<ProductId, BTreeSet<NaiveDate>>, ApplicationError> {
        Ok(self.selling_days_until(unit_id, days, Utc::now().date_naive()).await)
    }
}

/// Stock rows keyed by (unit, product). Category sales are supplied directly rather
/// than derived from a sales table.
#[derive(Default)]
pub struct InMemoryStockRepository {
    rows: RwLock<BTreeMap<(UnitId, ProductId), (ProductSnapshot, bool)>>,
    category_sales: RwLock<HashMap<(UnitId, String), f64>>,
    rollups: RwLock<HashMap<ProductId, ForecastRollup>>,
    movements: RwLock<HashMap<(ProductId, UnitId), Vec<StockMovement>>>,
}

impl InMemoryStockRepository {
    pub fn with_products(products: Vec<ProductSnapshot>) -> Self {
        let rows = products
            .into_iter()
            .map(|product| ((product.unit_id.clone(), product.id.clone()), (product, true)))
            .collect();
        Self { rows: RwLock::new(rows), ..Self::default() }
    }

    pub async fn save_snapshot(&self, snapshot: ProductSnapshot, available: bool) {
        let key = (snapshot.unit_id.clone(), snapshot.id.clone());
        self.rows.write().await.insert(key, (snapshot, available));
    }

    pub async fn set_category_units_sold(&self, unit_id: &UnitId, category: &str, units: f64) {
        self.category_sales.write().await.insert((unit_id.clone(), category.to_string()), units);
    }

    pub async fn record_movement(&self, product_id: &ProductId, unit_id: &UnitId, movement: StockMovement) {
        let mut movements = self.movements.write().await;
        let entries = movements.entry((product_id.clone(), unit_id.clone())).or_default();
        entries.push(movement);
        entries.sort_by_key(|movement| movement.date);
    }

    pub async fn movements_until(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
        end: NaiveDate,
    ) -> Vec<StockMovement> {
        if days == 0 {
            return Vec::new();
        }
        let start = window_start(end, days);
        let movements = self.movements.read().await;
        movements
            .get(&(product_id.clone(), unit_id.clone()))
            .map(|entries| {
                entries
                    .iter()
                    .filter(|movement| movement.date >= start && movement.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn forecast_rollup(&self, product_id: &ProductId) -> Option<ForecastRollup> {
        self.rollups.read().await.get(product_id).copied()
    }

    async fn available<F>(&self, mut keep: F) -> Vec<ProductSnapshot>
    where
        F: FnMut(&ProductSnapshot) -> bool + Send,
    {
        let rows = self.rows.read().await;
        rows.values()
            .filter(|(product, available)| *available && keep(product))
            .map(|(product, _)| product.clone())
            .collect()
    }
}

#[async_trait]
impl StockRepository for InMemoryStockRepository {
    async fn stock_by_unit(
        &self,
        unit_id: &UnitId,
    ) -> Result<Vec<ProductSnapshot>, ApplicationError> {
        Ok(self.available(|product| &product.unit_id == unit_id).await)
    }

    async fn product_stock(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
    ) -> Result<Option<ProductSnapshot>, ApplicationError> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&(unit_id.clone(), product_id.clone()))
            .filter(|(_, available)| *available)
            .map(|(product, _)| product.clone()))
    }

    async fn stock_by_market(
        &self,
        market_id: &MarketId,
    ) -> Result<BTreeMap<UnitId, Vec<ProductSnapshot>>, ApplicationError> {
        let mut by_unit: BTreeMap<UnitId, Vec<ProductSnapshot>> = BTreeMap::new();
        for product in self.available(|product| &product.market_id == market_id).await {
            by_unit.entry(product.unit_id.clone()).or_default().push(product);
        }
        Ok(by_unit)
    }

    async fn category_units_sold(
        &self,
        unit_id: &UnitId,
        category: &str,
        _window_days: u32,
    ) -> Result<Option<f64>, ApplicationError> {
        let sales = self.category_sales.read().await;
        Ok(sales.get(&(unit_id.clone(), category.to_string())).copied())
    }

    async fn update_forecast_rollup(
        &self,
        product_id: &ProductId,
        rollup: ForecastRollup,
    ) -> Result<(), ApplicationError> {
        let known = self.rows.read().await.keys().any(|(_, id)| id == product_id);
        if !known {
            return Err(ApplicationError::Persistence(format!("not found: product `{product_id}`")));
        }
        self.rollups.write().await.insert(product_id.clone(), rollup);
        Ok(())
    }

    async fn stock_movements(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<Vec<StockMovement>, ApplicationError> {
        Ok(self.movements_until(product_id, unit_id, days, Utc::now().date_naive()).await)
    }
}

#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: RwLock<Vec<PersistedAlert>>,
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn delete_alerts(
        &self,
        market_id: &MarketId,
        unit_id: &UnitId,
        types: &[AlertType],
    ) -> Result<u64, ApplicationError> {
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|alert| {
            !(&alert.market_id == market_id
                && &alert.unit_id == unit_id
                && types.contains(&alert.alert_type))
        });
        Ok((before - alerts.len()) as u64)
    }

    async fn insert_alerts(&self, alerts: Vec<PersistedAlert>) -> Result<(), ApplicationError> {
        self.alerts.write().await.extend(alerts);
        Ok(())
    }

    async fn list_alerts(&self, unit_id: &UnitId) -> Result<Vec<PersistedAlert>, ApplicationError> {
        let alerts = self.alerts.read().await;
        let mut found: Vec<PersistedAlert> =
            alerts.iter().filter(|alert| &alert.unit_id == unit_id).cloned().collect();
        found.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(found)
    }
}
