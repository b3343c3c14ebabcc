//! Data-access seams consumed by the engines. Implementations live in `precivox-db`.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    AlertType, ForecastRollup, MarketId, PersistedAlert, ProductId, ProductSnapshot, SalesRecord,
    StockMovement, UnitId,
};
use crate::errors::ApplicationError;

#[async_trait]
pub trait SalesRepository: Send + Sync {
    /// Exactly `days` records ending today, oldest first, zero-filled for days without sales.
    async fn sales_history(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<Vec<SalesRecord>, ApplicationError>;

    /// Days with a positive sale of each product at the unit over the trailing window.
    /// Products that never sold are absent.
    async fn selling_days(
        &self,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<BTreeMap<ProductId, BTreeSet<NaiveDate>>, ApplicationError>;
}

#[async_trait]
pub trait StockRepository: Send + Sync {
    async fn stock_by_unit(&self, unit_id: &UnitId)
        -> Result<Vec<ProductSnapshot>, ApplicationError>;

    async fn product_stock(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
    ) -> Result<Option<ProductSnapshot>, ApplicationError>;

    /// Available stock of every unit in the market, keyed by unit.
    async fn stock_by_market(
        &self,
        market_id: &MarketId,
    ) -> Result<BTreeMap<UnitId, Vec<ProductSnapshot>>, ApplicationError>;

    /// Units of `category` sold at the unit over the trailing window. `None` when the
    /// category has no sales data at all.
    async fn category_units_sold(
        &self,
        unit_id: &UnitId,
        category: &str,
        window_days: u32,
    ) -> Result<Option<f64>, ApplicationError>;

    async fn update_forecast_rollup(
        &self,
        product_id: &ProductId,
        rollup: ForecastRollup,
    ) -> Result<(), ApplicationError>;

    /// Movements over the trailing window ending today, oldest first.
    async fn stock_movements(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<Vec<StockMovement>, ApplicationError>;
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn delete_alerts(
        &self,
        market_id: &MarketId,
        unit_id: &UnitId,
        types: &[AlertType],
    ) -> Result<u64, ApplicationError>;

    async fn insert_alerts(&self, alerts: Vec<PersistedAlert>) -> Result<(), ApplicationError>;

    async fn list_alerts(&self, unit_id: &UnitId) -> Result<Vec<PersistedAlert>, ApplicationError>;
}
