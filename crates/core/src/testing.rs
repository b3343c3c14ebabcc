//! In-crate fakes for the data-access ports.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    AlertType, ForecastRollup, MarketId, PersistedAlert, ProductId, ProductSnapshot, SalesRecord,
    StockMovement, UnitId,
};
use crate::errors::ApplicationError;
use crate::ports::{AlertRepository, SalesRepository, StockRepository};

pub fn product(id: &str, name: &str, category: Option<&str>, price: f64, quantity: u32) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::from(id),
        name: name.to_string(),
        category: category.map(str::to_string),
        brand: None,
        price,
        promo_price: None,
        quantity,
        unit_id: UnitId::from("unit-1"),
        market_id: MarketId::from("market-1"),
        barcode: None,
        unit_of_measure: None,
    }
}

#[derive(Default)]
pub struct FakeSales {
    histories: Mutex<HashMap<(ProductId, UnitId), Vec<SalesRecord>>>,
    failure: Mutex<Option<String>>,
}

impl FakeSales {
    pub fn set_history(&self, product: &ProductId, unit: &UnitId, history: Vec<SalesRecord>) {
        self.histories.lock().expect("lock").insert((product.clone(), unit.clone()), history);
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().expect("lock") = Some(message.to_string());
    }
}

#[async_trait]
impl SalesRepository for FakeSales {
    async fn sales_history(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<Vec<SalesRecord>, ApplicationError> {
        if let Some(message) = self.failure.lock().expect("lock").clone() {
            return Err(ApplicationError::Persistence(message));
        }
        let history = self
            .histories
            .lock()
            .expect("lock")
            .get(&(product_id.clone(), unit_id.clone()))
            .cloned()
            .unwrap_or_default();
        let skip = history.len().saturating_sub(days as usize);
        Ok(history.into_iter().skip(skip).collect())
    }

    async fn selling_days(
        &self,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<BTreeMap<ProductId, BTreeSet<NaiveDate>>, ApplicationError> {
        if let Some(message) = self.failure.lock().expect("lock").clone() {
            return Err(ApplicationError::Persistence(message));
        }
        let mut selling = BTreeMap::new();
        for ((product_id, unit), history) in self.histories.lock().expect("lock").iter() {
            if unit != unit_id {
                continue;
            }
            let skip = history.len().saturating_sub(days as usize);
            let dates: BTreeSet<NaiveDate> = history
                .iter()
                .skip(skip)
                .filter(|record| record.quantity > 0.0)
                .map(|record| record.date)
                .collect();
            if !dates.is_empty() {
                selling.insert(product_id.clone(), dates);
            }
        }
        Ok(selling)
    }
}

#[derive(Default)]
pub struct FakeStock {
    products: Mutex<Vec<ProductSnapshot>>,
    category_sales: Mutex<HashMap<String, f64>>,
    rollups: Mutex<Vec<(ProductId, ForecastRollup)>>,
    movements: Mutex<Vec<(ProductId, UnitId, StockMovement)>>,
    failure: Mutex<Option<String>>,
    rollup_failure: Mutex<bool>,
    category_failure: Mutex<bool>,
}

impl FakeStock {
    pub fn with_products(products: Vec<ProductSnapshot>) -> Self {
        let stock = Self::default();
        *stock.products.lock().expect("lock") = products;
        stock
    }

    pub fn set_category_sales(&self, category: &str, units: f64) {
        self.category_sales.lock().expect("lock").insert(category.to_string(), units);
    }

    pub fn add_movement(&self, product: &ProductId, unit: &UnitId, movement: StockMovement) {
        self.movements.lock().expect("lock").push((product.clone(), unit.clone(), movement));
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().expect("lock") = Some(message.to_string());
    }

    pub fn fail_rollups(&self) {
        *self.rollup_failure.lock().expect("lock") = true;
    }

    pub fn fail_category_sales(&self) {
        *self.category_failure.lock().expect("lock") = true;
    }

    pub fn rollups(&self) -> Vec<(ProductId, ForecastRollup)> {
        self.rollups.lock().expect("lock").clone()
    }

    fn check(&self) -> Result<(), ApplicationError> {
        match self.failure.lock().expect("lock").clone() {
            Some(message) => Err(ApplicationError::Persistence(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StockRepository for FakeStock {
    async fn stock_by_unit(
        &self,
        unit_id: &UnitId,
    ) -> Result<Vec<ProductSnapshot>, ApplicationError> {
        self.check()?;
        Ok(self
            .products
            .lock()
            .expect("lock")
            .iter()
            .filter(|product| &product.unit_id == unit_id)
            .cloned()
            .collect())
    }

    async fn product_stock(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
    ) -> Result<Option<ProductSnapshot>, ApplicationError> {
        self.check()?;
        Ok(self
            .products
            .lock()
            .expect("lock")
            .iter()
            .find(|product| &product.id == product_id && &product.unit_id == unit_id)
            .cloned())
    }

    async fn stock_by_market(
        &self,
        market_id: &MarketId,
    ) -> Result<BTreeMap<UnitId, Vec<ProductSnapshot>>, ApplicationError> {
        self.check()?;
        let mut grouped: BTreeMap<UnitId, Vec<ProductSnapshot>> = BTreeMap::new();
        for product in self.products.lock().expect("lock").iter() {
            if &product.market_id == market_id {
                grouped.entry(product.unit_id.clone()).or_default().push(product.clone());
            }
        }
        Ok(grouped)
    }

    async fn category_units_sold(
        &self,
        _unit_id: &UnitId,
        category: &str,
        _window_days: u32,
    ) -> Result<Option<f64>, ApplicationError> {
        if *self.category_failure.lock().expect("lock") {
            return Err(ApplicationError::Persistence("sales aggregate failed".to_string()));
        }
        Ok(self.category_sales.lock().expect("lock").get(category).copied())
    }

    async fn update_forecast_rollup(
        &self,
        product_id: &ProductId,
        rollup: ForecastRollup,
    ) -> Result<(), ApplicationError> {
        if *self.rollup_failure.lock().expect("lock") {
            return Err(ApplicationError::Persistence("product row locked".to_string()));
        }
        self.rollups.lock().expect("lock").push((product_id.clone(), rollup));
        Ok(())
    }

    async fn stock_movements(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        _days: u32,
    ) -> Result<Vec<StockMovement>, ApplicationError> {
        self.check()?;
        Ok(self
            .movements
            .lock()
            .expect("lock")
            .iter()
            .filter(|(product, unit, _)| product == product_id && unit == unit_id)
            .map(|(_, _, movement)| movement.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct FakeAlerts {
    rows: Mutex<Vec<PersistedAlert>>,
    failure: Mutex<bool>,
}

impl FakeAlerts {
    pub fn fail(&self) {
        *self.failure.lock().expect("lock") = true;
    }

    pub fn rows(&self) -> Vec<PersistedAlert> {
        self.rows.lock().expect("lock").clone()
    }
}

#[async_trait]
impl AlertRepository for FakeAlerts {
    async fn delete_alerts(
        &self,
        market_id: &MarketId,
        unit_id: &UnitId,
        types: &[AlertType],
    ) -> Result<u64, ApplicationError> {
        if *self.failure.lock().expect("lock") {
            return Err(ApplicationError::Persistence("alert table unavailable".to_string()));
        }
        let mut rows = self.rows.lock().expect("lock");
        let before = rows.len();
        rows.retain(|row| {
            !(&row.market_id == market_id
                && &row.unit_id == unit_id
                && types.contains(&row.alert_type))
        });
        Ok((before - rows.len()) as u64)
    }

    async fn insert_alerts(&self, alerts: Vec<PersistedAlert>) -> Result<(), ApplicationError> {
        if *self.failure.lock().expect("lock") {
            return Err(ApplicationError::Persistence("alert table unavailable".to_string()));
        }
        self.rows.lock().expect("lock").extend(alerts);
        Ok(())
    }

    async fn list_alerts(&self, unit_id: &UnitId) -> Result<Vec<PersistedAlert>, ApplicationError> {
        Ok(self
            .rows
            .lock()
            .expect("lock")
            .iter()
            .filter(|row| &row.unit_id == unit_id)
            .cloned()
            .collect())
    }
}
