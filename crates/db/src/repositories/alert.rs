use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use precivox_core::domain::{
    AlertPriority, AlertType, MarketId, PersistedAlert, ProductId, UnitId,
};
use precivox_core::errors::ApplicationError;
use precivox_core::ports::AlertRepository;

use super::{parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlAlertRepository {
    pool: DbPool,
}

impl SqlAlertRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn delete_scoped(
        &self,
        market_id: &MarketId,
        unit_id: &UnitId,
        types: &[AlertType],
    ) -> Result<u64, RepositoryError> {
        if types.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("DELETE FROM ai_alert WHERE market_id = ");
        builder.push_bind(market_id.as_str());
        builder.push(" AND unit_id = ");
        builder.push_bind(unit_id.as_str());
        builder.push(" AND alert_type IN (");
        let mut separated = builder.separated(", ");
        for alert_type in types {
            separated.push_bind(alert_type.as_str());
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_all(&self, alerts: &[PersistedAlert]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for alert in alerts {
            sqlx::query(
                "INSERT INTO ai_alert (
                    id,
                    market_id,
                    unit_id,
                    product_id,
                    alert_type,
                    title,
                    description,
                    priority,
                    recommended_action,
                    action_link,
                    is_read,
                    metadata_json,
                    created_at,
                    expires_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&alert.id)
            .bind(alert.market_id.as_str())
            .bind(alert.unit_id.as_str())
            .bind(alert.product_id.as_str())
            .bind(alert.alert_type.as_str())
            .bind(&alert.title)
            .bind(&alert.description)
            .bind(alert.priority.as_str())
            .bind(&alert.recommended_action)
            .bind(&alert.action_link)
            .bind(alert.read)
            .bind(serde_json::to_string(&alert.metadata)?)
            .bind(alert.created_at.to_rfc3339())
            .bind(alert.expires_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn for_unit(&self, unit_id: &UnitId) -> Result<Vec<PersistedAlert>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                market_id,
                unit_id,
                product_id,
                alert_type,
                title,
                description,
                priority,
                recommended_action,
                action_link,
                is_read,
                metadata_json,
                created_at,
                expires_at
             FROM ai_alert
             WHERE unit_id = ?
             ORDER BY created_at DESC, rowid ASC",
        )
        .bind(unit_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(alert_from_row).collect()
    }
}

#[async_trait]
impl AlertRepository for SqlAlertRepository {
    async fn delete_alerts(
        &self,
        market_id: &MarketId,
        unit_id: &UnitId,
        types: &[AlertType],
    ) -> Result<u64, ApplicationError> {
        Ok(self.delete_scoped(market_id, unit_id, types).await?)
    }

    async fn insert_alerts(&self, alerts: Vec<PersistedAlert>) -> Result<(), ApplicationError> {
        Ok(self.insert_all(&alerts).await?)
    }

    async fn list_alerts(&self, unit_id: &UnitId) -> Result<Vec<PersistedAlert>, ApplicationError> {
        Ok(self.for_unit(unit_id).await?)
    }
}

fn alert_from_row(row: SqliteRow) -> Result<PersistedAlert, RepositoryError> {
    let type_raw = row.try_get::<String, _>("alert_type")?;
    let alert_type = AlertType::parse(&type_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown alert type `{type_raw}`")))?;
    let priority_raw = row.try_get::<String, _>("priority")?;
    let priority = AlertPriority::parse(&priority_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown alert priority `{priority_raw}`")))?;
    let metadata = serde_json::from_str(&row.try_get::<String, _>("metadata_json")?)?;

    Ok(PersistedAlert {
        id: row.try_get("id")?,
        market_id: MarketId(row.try_get("market_id")?),
        unit_id: UnitId(row.try_get("unit_id")?),
        product_id: ProductId(row.try_get("product_id")?),
        alert_type,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        priority,
        recommended_action: row.try_get("recommended_action")?,
        action_link: row.try_get("action_link")?,
        read: row.try_get("is_read")?,
        metadata,
        created_at: parse_timestamp("created_at", &row.try_get::<String, _>("created_at")?)?,
        expires_at: parse_timestamp("expires_at", &row.try_get::<String, _>("expires_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use precivox_core::domain::{
        AlertPriority, AlertType, AlertUrgency, MarketId, PersistedAlert, ProductId, StockAlert,
        UnitId,
    };
    use precivox_core::ports::AlertRepository;

    use super::SqlAlertRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn created_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-10T12:00:00Z").expect("timestamp").with_timezone(&Utc)
    }

    fn alert(id: &str, unit: &str, alert_type: AlertType) -> PersistedAlert {
        let stock_alert = StockAlert {
            alert_type,
            priority: AlertPriority::High,
            product_id: ProductId::from("prod-leite"),
            product_name: "Leite Integral".to_string(),
            category: Some("Laticinios".to_string()),
            description: "Stock below safety level".to_string(),
            current_qty: 4,
            recommended_qty: 50,
            days_to_rupture: Some(2),
            impact_value: Some(19.6),
            recommended_action: "Restock".to_string(),
            urgency: AlertUrgency::Immediate,
        };
        PersistedAlert::from_stock_alert(
            id,
            MarketId::from("market-default"),
            UnitId::from(unit),
            &stock_alert,
            created_at(),
            Duration::days(7),
        )
    }

    #[tokio::test]
    async fn alerts_round_trip_with_metadata() {
        let repo = SqlAlertRepository::new(setup_pool().await);
        let expected = alert("alert-1", "unit-centro", AlertType::Rupture);

        repo.insert_alerts(vec![expected.clone()]).await.expect("insert");
        let stored = repo.list_alerts(&UnitId::from("unit-centro")).await.expect("list");

        assert_eq!(stored, vec![expected]);
    }

    #[tokio::test]
    async fn delete_is_scoped_to_unit_and_types() {
        let repo = SqlAlertRepository::new(setup_pool().await);
        repo.insert_alerts(vec![
            alert("alert-1", "unit-centro", AlertType::Rupture),
            alert("alert-2", "unit-centro", AlertType::Expiry),
            alert("alert-3", "unit-norte", AlertType::Rupture),
        ])
        .await
        .expect("insert");

        let removed = repo
            .delete_alerts(
                &MarketId::from("market-default"),
                &UnitId::from("unit-centro"),
                &AlertType::STOCK_HEALTH,
            )
            .await
            .expect("delete");

        assert_eq!(removed, 1);
        let centro = repo.list_alerts(&UnitId::from("unit-centro")).await.expect("list");
        assert_eq!(centro.len(), 1);
        assert_eq!(centro[0].alert_type, AlertType::Expiry);
        assert_eq!(repo.list_alerts(&UnitId::from("unit-norte")).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn empty_type_list_deletes_nothing() {
        let repo = SqlAlertRepository::new(setup_pool().await);
        repo.insert_alerts(vec![alert("alert-1", "unit-centro", AlertType::Rupture)])
            .await
            .expect("insert");

        let removed = repo
            .delete_alerts(&MarketId::from("market-default"), &UnitId::from("unit-centro"), &[])
            .await
            .expect("delete");
        assert_eq!(removed, 0);
    }
}
