use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use precivox_core::suite::{EngineDescriptor, EngineSuite};
use precivox_db::migrations::{self, MigrationStatus};
use precivox_db::DbPool;
use serde::Serialize;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    engines: [EngineDescriptor; 4],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatabaseHealth {
    pub status: Readiness,
    pub pool_size: u32,
    pub idle_connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations_applied: Option<i64>,
    pub migrations_expected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: Readiness,
    pub database: DatabaseHealth,
    pub engines: Vec<EngineDescriptor>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, suite: &EngineSuite) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(HealthState { db_pool, engines: suite.engines() })
}

/// Ready once the pool answers and every embedded migration has been applied.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_health(&state.db_pool).await;
    let status = database.status;

    let payload = HealthResponse {
        status,
        database,
        engines: state.engines.to_vec(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let code = match status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(payload))
}

async fn database_health(pool: &DbPool) -> DatabaseHealth {
    let mut health = DatabaseHealth {
        status: Readiness::Degraded,
        pool_size: pool.size(),
        idle_connections: pool.num_idle(),
        migrations_applied: None,
        migrations_expected: migrations::expected_migrations(),
        error: None,
    };

    match migrations::status(pool).await {
        Ok(migration_status) => {
            let MigrationStatus { applied, expected } = migration_status;
            health.migrations_applied = Some(applied);
            if migration_status.is_current() {
                health.status = Readiness::Ready;
            } else {
                health.error = Some(format!("{applied}/{expected} migrations applied"));
            }
        }
        Err(error) => health.error = Some(format!("database query failed: {error}")),
    }

    if let Some(error) = &health.error {
        warn!(
            event_name = "system.health.database_degraded",
            correlation_id = "health",
            error = %error,
            "database health check failed"
        );
    }
    health
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use precivox_core::config::EngineConfig;
    use precivox_core::random::EngineRng;
    use precivox_core::suite::{EngineRepositories, EngineSuite};
    use precivox_core::telemetry::Telemetry;
    use precivox_db::{
        connect_with_settings, migrations, DbPool, InMemoryAlertRepository,
        InMemorySalesRepository, InMemoryStockRepository,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::health::router;

    fn suite() -> EngineSuite {
        EngineSuite::new(
            EngineRepositories {
                sales: Arc::new(InMemorySalesRepository::default()),
                stock: Arc::new(InMemoryStockRepository::default()),
                alerts: Arc::new(InMemoryAlertRepository::default()),
            },
            Telemetry::silent(),
            EngineRng::fixed(0.5),
            &EngineConfig::default(),
        )
    }

    async fn memory_pool() -> DbPool {
        connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect")
    }

    async fn check(pool: DbPool) -> (StatusCode, Value) {
        let response = router(pool, &suite())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn migrated_database_reports_ready_with_engine_versions() {
        let pool = memory_pool().await;
        migrations::run_pending(&pool).await.expect("migrate");

        let (status, body) = check(pool.clone()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["database"]["migrations_applied"], 1);
        assert_eq!(body["database"]["migrations_expected"], 1);
        assert_eq!(body["database"]["pool_size"], 1);
        assert!(body["database"].get("error").is_none());
        assert_eq!(body["engines"].as_array().map(Vec::len), Some(4));
        assert_eq!(body["engines"][3]["name"], "GROOCEngine");
        assert_eq!(body["engines"][3]["version"], "2.0.0-enhanced");

        pool.close().await;
    }

    #[tokio::test]
    async fn pending_migrations_report_degraded() {
        let pool = memory_pool().await;

        let (status, body) = check(pool.clone()).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"]["migrations_applied"], 0);
        assert_eq!(body["database"]["error"], "0/1 migrations applied");

        pool.close().await;
    }

    #[tokio::test]
    async fn closed_pool_reports_query_failure() {
        let pool = memory_pool().await;
        pool.close().await;

        let (status, body) = check(pool).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["database"].get("migrations_applied").is_none());
        assert!(body["database"]["error"]
            .as_str()
            .is_some_and(|error| error.starts_with("database query failed")));
        assert_eq!(body["engines"].as_array().map(Vec::len), Some(4));
    }
}
