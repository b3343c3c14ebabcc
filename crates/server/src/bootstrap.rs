use std::sync::Arc;

use precivox_core::config::{AppConfig, ConfigError, LoadOptions};
use precivox_core::suite::{EngineRepositories, EngineSuite};
use precivox_db::{
    connect_with_config, migrations, DbPool, SqlAlertRepository, SqlSalesRepository,
    SqlStockRepository,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub suite: EngineSuite,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        database_url = %config.database.url,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let repositories = EngineRepositories {
        sales: Arc::new(SqlSalesRepository::new(db_pool.clone())),
        stock: Arc::new(SqlStockRepository::new(db_pool.clone())),
        alerts: Arc::new(SqlAlertRepository::new(db_pool.clone())),
    };
    let suite = EngineSuite::from_config(repositories, &config.engines);
    info!(
        event_name = "system.bootstrap.engines_ready",
        correlation_id = "bootstrap",
        default_market_id = %config.engines.default_market_id,
        seeded = config.engines.rng_seed.is_some(),
        "analytics engines constructed"
    );

    Ok(Application { config, db_pool, suite })
}
