use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::Row;

use precivox_core::domain::{ProductId, SalesRecord, UnitId};
use precivox_core::errors::ApplicationError;
use precivox_core::ports::SalesRepository;

use super::{format_date, parse_date, window_start, RepositoryError};
use crate::DbPool;

pub struct SqlSalesRepository {
    pool: DbPool,
}

impl SqlSalesRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Daily totals for the `days` days ending on `end`, zero-filled and oldest first.
    pub async fn history_until(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
        end: NaiveDate,
    ) -> Result<Vec<SalesRecord>, RepositoryError> {
        if days == 0 {
            return Ok(Vec::new());
        }

        let start = window_start(end, days);
        let rows = sqlx::query(
            "SELECT sale_date, SUM(quantity) AS quantity, SUM(revenue) AS revenue
             FROM sale
             WHERE product_id = ? AND unit_id = ? AND sale_date >= ? AND sale_date <= ?
             GROUP BY sale_date",
        )
        .bind(product_id.as_str())
        .bind(unit_id.as_str())
        .bind(format_date(start))
        .bind(format_date(end))
        .fetch_all(&self.pool)
        .await?;

        let mut totals = HashMap::with_capacity(rows.len());
        for row in rows {
            let date = parse_date("sale_date", &row.try_get::<String, _>("sale_date")?)?;
            totals.insert(date, (row.try_get::<f64, _>("quantity")?, row.try_get::<f64, _>("revenue")?));
        }

        Ok(zero_filled(end, days, &totals))
    }

    /// Days with a positive sale of each product at the unit, for the `days` days
    /// ending on `end`.
    pub async fn selling_days_until(
        &self,
        unit_id: &UnitId,
        days: u32,
        end: NaiveDate,
    ) -> Result<BTreeMap<ProductId, BTreeSet<NaiveDate>>, RepositoryError> {
        if days == 0 {
            return Ok(BTreeMap::new());
        }

        let rows = sqlx::query(
            "SELECT product_id, sale_date
             FROM sale
             WHERE unit_id = ? AND sale_date >= ? AND sale_date <= ?
             GROUP BY product_id, sale_date
             HAVING SUM(quantity) > 0",
        )
        .bind(unit_id.as_str())
        .bind(format_date(window_start(end, days)))
        .bind(format_date(end))
        .fetch_all(&self.pool)
        .await?;

        let mut selling: BTreeMap<ProductId, BTreeSet<NaiveDate>> = BTreeMap::new();
        for row in rows {
            let product_id = ProductId::from(row.try_get::<String, _>("product_id")?);
            let date = parse_date("sale_date", &row.try_get::<String, _>("sale_date")?)?;
            selling.entry(product_id).or_default().insert(date);
        }
        Ok(selling)
    }

    pub async fn record_sale(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        date: NaiveDate,
        quantity: f64,
        revenue: f64,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sale (sale_date, product_id, unit_id, quantity, revenue)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(format_date(date))
        .bind(product_id.as_str())
        .bind(unit_id.as_str())
        .bind(quantity)
        .bind(revenue)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SalesRepository for SqlSalesRepository {
    async fn sales_history(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<Vec<SalesRecord>, ApplicationError> {
        Ok(self.history_until(product_id, unit_id, days, Utc::now().date_naive()).await?)
    }

    async fn selling_days(
        &self,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<BTreeMap<ProductId, BTreeSet<NaiveDate>>, ApplicationError> {
        Ok(self.selling_days_until(unit_id, days, Utc::now().date_naive()).await?)
    }
}

/// One record per day of the window; days missing from `totals` are zero.
pub(crate) fn zero_filled(
    end: NaiveDate,
    days: u32,
    totals: &HashMap<NaiveDate, (f64, f64)>,
) -> Vec<SalesRecord> {
    let start = window_start(end, days);
    start
        .iter_days()
        .take(days as usize)
        .map(|date| match totals.get(&date) {
            Some((quantity, revenue)) => SalesRecord::new(date, *quantity, *revenue),
            None => SalesRecord::empty(date),
        })
        .collect()
}
