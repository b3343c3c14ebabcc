use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use precivox_core::domain::{
    ForecastRollup, MarketId, MovementKind, ProductId, ProductSnapshot, StockMovement, UnitId,
};
use precivox_core::errors::ApplicationError;
use precivox_core::ports::StockRepository;

use super::{format_date, parse_date, parse_quantity, window_start, RepositoryError};
use crate::DbPool;

const SNAPSHOT_COLUMNS: &str = "SELECT
        p.id AS product_id,
        p.name AS name,
        p.category AS category,
        p.brand AS brand,
        p.barcode AS barcode,
        p.unit_of_measure AS unit_of_measure,
        s.price AS price,
        s.promo_price AS promo_price,
        s.quantity AS quantity,
        s.unit_id AS unit_id,
        u.market_id AS market_id
     FROM stock s
     JOIN product p ON p.id = s.product_id
     JOIN store_unit u ON u.id = s.unit_id";

pub struct SqlStockRepository {
    pool: DbPool,
}

impl SqlStockRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn available_in_unit(
        &self,
        unit_id: &UnitId,
    ) -> Result<Vec<ProductSnapshot>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SNAPSHOT_COLUMNS}
             WHERE s.available = 1 AND s.unit_id = ?
             ORDER BY p.name ASC, p.id ASC"
        ))
        .bind(unit_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(snapshot_from_row).collect()
    }

    pub async fn available_product(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{SNAPSHOT_COLUMNS}
             WHERE s.available = 1 AND s.unit_id = ? AND s.product_id = ?"
        ))
        .bind(unit_id.as_str())
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(snapshot_from_row).transpose()
    }

    pub async fn available_in_market(
        &self,
        market_id: &MarketId,
    ) -> Result<BTreeMap<UnitId, Vec<ProductSnapshot>>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SNAPSHOT_COLUMNS}
             WHERE s.available = 1 AND u.market_id = ?
             ORDER BY s.unit_id ASC, p.name ASC, p.id ASC"
        ))
        .bind(market_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut by_unit: BTreeMap<UnitId, Vec<ProductSnapshot>> = BTreeMap::new();
        for row in rows {
            let snapshot = snapshot_from_row(row)?;
            by_unit.entry(snapshot.unit_id.clone()).or_default().push(snapshot);
        }
        Ok(by_unit)
    }

    /// Units of `category` sold at the unit during the `window_days` days ending on `end`.
    pub async fn category_units_sold_until(
        &self,
        unit_id: &UnitId,
        category: &str,
        window_days: u32,
        end: NaiveDate,
    ) -> Result<Option<f64>, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(sa.id) AS sales, SUM(sa.quantity) AS quantity
             FROM sale sa
             JOIN product p ON p.id = sa.product_id
             WHERE sa.unit_id = ? AND p.category = ? AND sa.sale_date >= ? AND sa.sale_date <= ?",
        )
        .bind(unit_id.as_str())
        .bind(category)
        .bind(format_date(window_start(end, window_days)))
        .bind(format_date(end))
        .fetch_one(&self.pool)
        .await?;

        if row.try_get::<i64, _>("sales")? == 0 {
            return Ok(None);
        }
        Ok(row.try_get::<Option<f64>, _>("quantity")?)
    }

    /// Movements during the `days` days ending on `end`, oldest first.
    pub async fn movements_until(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
        end: NaiveDate,
    ) -> Result<Vec<StockMovement>, RepositoryError> {
        if days == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT movement_date, kind, quantity
             FROM stock_movement
             WHERE product_id = ? AND unit_id = ? AND movement_date >= ? AND movement_date <= ?
             ORDER BY movement_date ASC, id ASC",
        )
        .bind(product_id.as_str())
        .bind(unit_id.as_str())
        .bind(format_date(window_start(end, days)))
        .bind(format_date(end))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(movement_from_row).collect()
    }

    pub async fn record_movement(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        movement: &StockMovement,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO stock_movement (movement_date, product_id, unit_id, kind, quantity)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(format_date(movement.date))
        .bind(product_id.as_str())
        .bind(unit_id.as_str())
        .bind(movement.kind.as_str())
        .bind(i64::from(movement.quantity))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn forecast_rollup(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ForecastRollup>, RepositoryError> {
        let row = sqlx::query("SELECT forecast_7d, forecast_30d FROM product WHERE id = ?")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let forecast_7d = row.try_get::<Option<i64>, _>("forecast_7d")?;
        let forecast_30d = row.try_get::<Option<i64>, _>("forecast_30d")?;
        match (forecast_7d, forecast_30d) {
            (Some(forecast_7d), Some(forecast_30d)) => Ok(Some(ForecastRollup {
                forecast_7d: parse_quantity("forecast_7d", forecast_7d)?,
                forecast_30d: parse_quantity("forecast_30d", forecast_30d)?,
            })),
            _ => Ok(None),
        }
    }

    /// Upserts the product record and its stock row at the snapshot's unit.
    pub async fn save_snapshot(
        &self,
        snapshot: &ProductSnapshot,
        available: bool,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO product (id, name, category, brand, barcode, unit_of_measure)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                brand = excluded.brand,
                barcode = excluded.barcode,
                unit_of_measure = excluded.unit_of_measure",
        )
        .bind(snapshot.id.as_str())
        .bind(&snapshot.name)
        .bind(snapshot.category.as_deref())
        .bind(snapshot.brand.as_deref())
        .bind(snapshot.barcode.as_deref())
        .bind(snapshot.unit_of_measure.as_deref())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO stock (unit_id, product_id, price, promo_price, quantity, available, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(unit_id, product_id) DO UPDATE SET
                price = excluded.price,
                promo_price = excluded.promo_price,
                quantity = excluded.quantity,
                available = excluded.available,
                updated_at = excluded.updated_at",
        )
        .bind(snapshot.unit_id.as_str())
        .bind(snapshot.id.as_str())
        .bind(snapshot.price)
        .bind(snapshot.promo_price)
        .bind(i64::from(snapshot.quantity))
        .bind(available)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn write_rollup(
        &self,
        product_id: &ProductId,
        rollup: ForecastRollup,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE product SET forecast_7d = ?, forecast_30d = ?, ai_updated_at = ? WHERE id = ?",
        )
        .bind(i64::from(rollup.forecast_7d))
        .bind(i64::from(rollup.forecast_30d))
        .bind(Utc::now().to_rfc3339())
        .bind(product_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("product `{product_id}`")));
        }
        Ok(())
    }
}

#[async_trait]
impl StockRepository for SqlStockRepository {
    async fn stock_by_unit(
        &self,
        unit_id: &UnitId,
    ) -> Result<Vec<ProductSnapshot>, ApplicationError> {
        Ok(self.available_in_unit(unit_id).await?)
    }

    async fn product_stock(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
    ) -> Result<Option<ProductSnapshot>, ApplicationError> {
        Ok(self.available_product(product_id, unit_id).await?)
    }

    async fn stock_by_market(
        &self,
        market_id: &MarketId,
    ) -> Result<BTreeMap<UnitId, Vec<ProductSnapshot>>, ApplicationError> {
        Ok(self.available_in_market(market_id).await?)
    }

    async fn category_units_sold(
        &self,
        unit_id: &UnitId,
        category: &str,
        window_days: u32,
    ) -> Result<Option<f64>, ApplicationError> {
        Ok(self
            .category_units_sold_until(unit_id, category, window_days, Utc::now().date_naive())
            .await?)
    }

    async fn update_forecast_rollup(
        &self,
        product_id: &ProductId,
        rollup: ForecastRollup,
    ) -> Result<(), ApplicationError> {
        Ok(self.write_rollup(product_id, rollup).await?)
    }

    async fn stock_movements(
        &self,
        product_id: &ProductId,
        unit_id: &UnitId,
        days: u32,
    ) -> Result<Vec<StockMovement>, ApplicationError> {
        Ok(self.movements_until(product_id, unit_id, days, Utc::now().date_naive()).await?)
    }
}

fn movement_from_row(row: SqliteRow) -> Result<StockMovement, RepositoryError> {
    let kind: String = row.try_get("kind")?;
    let kind = MovementKind::parse(&kind)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown movement kind `{kind}`")))?;

    Ok(StockMovement {
        date: parse_date("movement_date", &row.try_get::<String, _>("movement_date")?)?,
        kind,
        quantity: parse_quantity("quantity", row.try_get("quantity")?)?,
    })
}

fn snapshot_from_row(row: SqliteRow) -> Result<ProductSnapshot, RepositoryError> {
    Ok(ProductSnapshot {
        id: ProductId(row.try_get("product_id")?),
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        brand: row.try_get("brand")?,
        price: row.try_get("price")?,
        promo_price: row.try_get("promo_price")?,
        quantity: parse_quantity("quantity", row.try_get("quantity")?)?,
        unit_id: UnitId(row.try_get("unit_id")?),
        market_id: MarketId(row.try_get("market_id")?),
        barcode: row.try_get("barcode")?,
        unit_of_measure: row.try_get("unit_of_measure")?,
    })
}
