use chrono::{Datelike, NaiveDate, Utc, Weekday};

use crate::connection::DbPool;
use crate::repositories::{format_date, window_start, RepositoryError};

pub const DEMO_MARKET_ID: &str = "market-default";
pub const DEMO_MARKET_NAME: &str = "Supermercado Precivox";
pub const DEMO_SALES_DAYS: u32 = 30;

struct DemoUnit {
    id: &'static str,
    name: &'static str,
    address: &'static str,
    latitude: f64,
    longitude: f64,
    demand_factor: f64,
}

const DEMO_UNITS: &[DemoUnit] = &[
    DemoUnit {
        id: "unit-centro",
        name: "Loja Centro",
        address: "Rua XV de Novembro, 100",
        latitude: -25.4284,
        longitude: -49.2733,
        demand_factor: 1.0,
    },
    DemoUnit {
        id: "unit-norte",
        name: "Loja Norte",
        address: "Avenida Paraná, 2300",
        latitude: -25.3842,
        longitude: -49.2580,
        demand_factor: 0.8,
    },
];

pub const DEMO_UNIT_IDS: &[&str] = &["unit-centro", "unit-norte"];

/// Catalog entry with per-unit stock (`stock[i]` belongs to `DEMO_UNITS[i]`).
struct DemoProduct {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    brand: Option<&'static str>,
    unit_of_measure: &'static str,
    price: f64,
    promo_price: Option<f64>,
    base_daily_sales: f64,
    stock: [u32; 2],
}

const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        id: "prod-arroz-5kg",
        name: "Arroz Tipo 1 5kg",
        category: "Mercearia",
        brand: Some("Camil"),
        unit_of_measure: "un",
        price: 24.90,
        promo_price: None,
        base_daily_sales: 8.0,
        stock: [120, 60],
    },
    DemoProduct {
        id: "prod-feijao-1kg",
        name: "Feijao Carioca 1kg",
        category: "Mercearia",
        brand: Some("Kicaldo"),
        unit_of_measure: "un",
        price: 8.49,
        promo_price: Some(7.99),
        base_daily_sales: 6.0,
        stock: [80, 5],
    },
    DemoProduct {
        id: "prod-cafe-500g",
        name: "Cafe Torrado 500g",
        category: "Mercearia",
        brand: Some("Pilao"),
        unit_of_measure: "un",
        price: 17.90,
        promo_price: None,
        base_daily_sales: 4.0,
        stock: [40, 30],
    },
    DemoProduct {
        id: "prod-leite-1l",
        name: "Leite Integral 1L",
        category: "Laticinios",
        brand: Some("Italac"),
        unit_of_measure: "un",
        price: 4.99,
        promo_price: None,
        base_daily_sales: 15.0,
        stock: [8, 90],
    },
    DemoProduct {
        id: "prod-iogurte-170g",
        name: "Iogurte Natural 170g",
        category: "Laticinios",
        brand: Some("Nestle"),
        unit_of_measure: "un",
        price: 3.49,
        promo_price: Some(2.99),
        base_daily_sales: 5.0,
        stock: [35, 25],
    },
    DemoProduct {
        id: "prod-refrigerante-2l",
        name: "Refrigerante Cola 2L",
        category: "Bebidas",
        brand: Some("Coca-Cola"),
        unit_of_measure: "un",
        price: 9.99,
        promo_price: None,
        base_daily_sales: 10.0,
        stock: [260, 140],
    },
    DemoProduct {
        id: "prod-agua-1500ml",
        name: "Agua Mineral 1,5L",
        category: "Bebidas",
        brand: Some("Crystal"),
        unit_of_measure: "un",
        price: 2.79,
        promo_price: None,
        base_daily_sales: 12.0,
        stock: [150, 100],
    },
    DemoProduct {
        id: "prod-detergente-500ml",
        name: "Detergente Neutro 500ml",
        category: "Limpeza",
        brand: Some("Ype"),
        unit_of_measure: "un",
        price: 2.49,
        promo_price: None,
        base_daily_sales: 3.0,
        stock: [180, 70],
    },
    DemoProduct {
        id: "prod-banana-kg",
        name: "Banana Prata",
        category: "Hortifruti",
        brand: None,
        unit_of_measure: "kg",
        price: 6.99,
        promo_price: None,
        base_daily_sales: 9.0,
        stock: [45, 38],
    },
];

/// Deterministic demo data: one market, two store units, a grocery catalog and
/// [`DEMO_SALES_DAYS`] days of sales per product and unit. Loading twice yields the
/// same rows.
pub struct DemoDataset;

impl DemoDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        Self::load_as_of(pool, Utc::now().date_naive()).await
    }

    /// Loads the dataset with the sales window ending on `as_of`.
    pub async fn load_as_of(pool: &DbPool, as_of: NaiveDate) -> Result<SeedResult, RepositoryError> {
        let stock_rows = insert_catalog_skeleton(pool).await?;
        let sales_rows = insert_sales(pool, as_of).await?;
        let movement_rows = insert_movements(pool, as_of).await?;

        Ok(SeedResult {
            market_id: DEMO_MARKET_ID,
            units: DEMO_UNITS.len(),
            products: DEMO_PRODUCTS.len(),
            stock_rows,
            sales_rows,
            movement_rows,
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let market: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM market WHERE id = ?")
            .bind(DEMO_MARKET_ID)
            .fetch_one(pool)
            .await?;
        checks.push(("market", market == 1));

        let units: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM store_unit WHERE market_id = ?")
            .bind(DEMO_MARKET_ID)
            .fetch_one(pool)
            .await?;
        checks.push(("store-units", units == DEMO_UNITS.len() as i64));

        let mut products_present = true;
        let mut stock_present = true;
        let mut sales_present = true;
        let mut movements_present = true;
        for product in DEMO_PRODUCTS {
            let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM product WHERE id = ?)")
                .bind(product.id)
                .fetch_one(pool)
                .await?;
            products_present &= exists == 1;

            let stock: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM stock WHERE product_id = ? AND available = 1")
                    .bind(product.id)
                    .fetch_one(pool)
                    .await?;
            stock_present &= stock == DEMO_UNITS.len() as i64;

            let sales: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM sale WHERE product_id = ?")
                .bind(product.id)
                .fetch_one(pool)
                .await?;
            sales_present &= sales >= i64::from(DEMO_SALES_DAYS) * DEMO_UNITS.len() as i64;

            let inbound: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM stock_movement WHERE product_id = ? AND kind = 'INBOUND'",
            )
            .bind(product.id)
            .fetch_one(pool)
            .await?;
            movements_present &= inbound > 0;
        }
        checks.push(("products", products_present));
        checks.push(("stock", stock_present));
        checks.push(("sales", sales_present));
        checks.push(("movements", movements_present));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo market and everything hanging off it.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        for product in DEMO_PRODUCTS {
            sqlx::query("DELETE FROM sale WHERE product_id = ?").bind(product.id).execute(&mut *tx).await?;
            sqlx::query("DELETE FROM stock_movement WHERE product_id = ?")
                .bind(product.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM stock WHERE product_id = ?").bind(product.id).execute(&mut *tx).await?;
            sqlx::query("DELETE FROM product WHERE id = ?").bind(product.id).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM ai_alert WHERE market_id = ?")
            .bind(DEMO_MARKET_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM store_unit WHERE market_id = ?")
            .bind(DEMO_MARKET_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM market WHERE id = ?").bind(DEMO_MARKET_ID).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Upserts the market, units, products and stock rows. Returns the stock row count.
pub(crate) async fn insert_catalog_skeleton(pool: &DbPool) -> Result<usize, RepositoryError> {
    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO market (id, name, created_at) VALUES (?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
    )
    .bind(DEMO_MARKET_ID)
    .bind(DEMO_MARKET_NAME)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for unit in DEMO_UNITS {
        sqlx::query(
            "INSERT INTO store_unit (id, market_id, name, address, latitude, longitude, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                market_id = excluded.market_id,
                name = excluded.name,
                address = excluded.address,
                latitude = excluded.latitude,
                longitude = excluded.longitude",
        )
        .bind(unit.id)
        .bind(DEMO_MARKET_ID)
        .bind(unit.name)
        .bind(unit.address)
        .bind(unit.latitude)
        .bind(unit.longitude)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    let mut stock_rows = 0;
    for product in DEMO_PRODUCTS {
        sqlx::query(
            "INSERT INTO product (id, name, category, brand, unit_of_measure)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                brand = excluded.brand,
                unit_of_measure = excluded.unit_of_measure",
        )
        .bind(product.id)
        .bind(product.name)
        .bind(product.category)
        .bind(product.brand)
        .bind(product.unit_of_measure)
        .execute(&mut *tx)
        .await?;

        for (unit, quantity) in DEMO_UNITS.iter().zip(product.stock) {
            sqlx::query(
                "INSERT INTO stock (unit_id, product_id, price, promo_price, quantity, available, updated_at)
                 VALUES (?, ?, ?, ?, ?, 1, ?)
                 ON CONFLICT(unit_id, product_id) DO UPDATE SET
                    price = excluded.price,
                    promo_price = excluded.promo_price,
                    quantity = excluded.quantity,
                    available = 1,
                    updated_at = excluded.updated_at",
            )
            .bind(unit.id)
            .bind(product.id)
            .bind(product.price)
            .bind(product.promo_price)
            .bind(i64::from(quantity))
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            stock_rows += 1;
        }
    }

    tx.commit().await?;
    Ok(stock_rows)
}

/// Replaces the demo sales inside the window ending on `as_of`.
async fn insert_sales(pool: &DbPool, as_of: NaiveDate) -> Result<usize, RepositoryError> {
    let start = window_start(as_of, DEMO_SALES_DAYS);
    let mut tx = pool.begin().await?;
    let mut rows = 0;

    for (product_index, product) in DEMO_PRODUCTS.iter().enumerate() {
        for unit in DEMO_UNITS {
            sqlx::query(
                "DELETE FROM sale
                 WHERE product_id = ? AND unit_id = ? AND sale_date >= ? AND sale_date <= ?",
            )
            .bind(product.id)
            .bind(unit.id)
            .bind(format_date(start))
            .bind(format_date(as_of))
            .execute(&mut *tx)
            .await?;

            for (day_index, date) in start.iter_days().take(DEMO_SALES_DAYS as usize).enumerate() {
                let quantity = daily_quantity(product, unit, product_index, day_index, date);
                let revenue = round2(quantity * product.promo_price.unwrap_or(product.price));
                sqlx::query(
                    "INSERT INTO sale (sale_date, product_id, unit_id, quantity, revenue)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(format_date(date))
                .bind(product.id)
                .bind(unit.id)
                .bind(quantity)
                .bind(revenue)
                .execute(&mut *tx)
                .await?;
                rows += 1;
            }
        }
    }

    tx.commit().await?;
    Ok(rows)
}

/// Replaces the demo movements inside the window ending on `as_of`: a weekly
/// delivery covering seven days of demand plus one outbound movement per selling day.
async fn insert_movements(pool: &DbPool, as_of: NaiveDate) -> Result<usize, RepositoryError> {
    let start = window_start(as_of, DEMO_SALES_DAYS);
    let mut tx = pool.begin().await?;
    let mut rows = 0;

    for (product_index, product) in DEMO_PRODUCTS.iter().enumerate() {
        for unit in DEMO_UNITS {
            sqlx::query(
                "DELETE FROM stock_movement
                 WHERE product_id = ? AND unit_id = ? AND movement_date >= ? AND movement_date <= ?",
            )
            .bind(product.id)
            .bind(unit.id)
            .bind(format_date(start))
            .bind(format_date(as_of))
            .execute(&mut *tx)
            .await?;

            let delivery = (product.base_daily_sales * unit.demand_factor * 7.0).round() as i64;
            for (day_index, date) in start.iter_days().take(DEMO_SALES_DAYS as usize).enumerate() {
                let outbound = daily_quantity(product, unit, product_index, day_index, date) as i64;
                let inbound = if day_index % 7 == 0 { delivery } else { 0 };

                for (kind, quantity) in [("INBOUND", inbound), ("OUTBOUND", outbound)] {
                    if quantity <= 0 {
                        continue;
                    }
                    sqlx::query(
                        "INSERT INTO stock_movement (movement_date, product_id, unit_id, kind, quantity)
                         VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(format_date(date))
                    .bind(product.id)
                    .bind(unit.id)
                    .bind(kind)
                    .bind(quantity)
                    .execute(&mut *tx)
                    .await?;
                    rows += 1;
                }
            }
        }
    }

    tx.commit().await?;
    Ok(rows)
}

fn daily_quantity(
    product: &DemoProduct,
    unit: &DemoUnit,
    product_index: usize,
    day_index: usize,
    date: NaiveDate,
) -> f64 {
    let weekday_factor = match date.weekday() {
        Weekday::Sat | Weekday::Sun => 1.3,
        Weekday::Fri => 1.1,
        _ => 1.0,
    };
    let jitter = ((day_index * 7 + product_index * 3) % 5) as f64 - 2.0;
    (product.base_daily_sales * unit.demand_factor * weekday_factor + jitter).round().max(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug)]
pub struct SeedResult {
    pub market_id: &'static str,
    pub units: usize,
    pub products: usize,
    pub stock_rows: usize,
    pub sales_rows: usize,
    pub movement_rows: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
