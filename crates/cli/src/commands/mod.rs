pub mod config;
pub mod doctor;
pub mod forecast;
pub mod migrate;
pub mod price;
pub mod recommend;
pub mod seed;
pub mod stock_health;

use precivox_core::config::{AppConfig, LoadOptions};
use precivox_core::envelope::EngineResult;
use precivox_core::suite::{EngineRepositories, EngineSuite};
use precivox_db::{connect_with_config, migrations, DbPool};
use precivox_db::{SqlAlertRepository, SqlSalesRepository, SqlStockRepository};
use serde::Serialize;
use std::sync::Arc;

/// Error class, message and exit code of a failed step.
pub(crate) type StepFailure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Prints an engine envelope as-is. A failed envelope exits with code 1.
    pub fn envelope<T: Serialize>(command: &str, result: &EngineResult<T>) -> Self {
        match serde_json::to_string_pretty(result) {
            Ok(output) => Self { exit_code: if result.success { 0 } else { 1 }, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 8),
        }
    }

    pub(crate) fn from_step(command: &str, failure: StepFailure) -> Self {
        let (error_class, message, exit_code) = failure;
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Connects and applies pending migrations.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, StepFailure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

pub(crate) fn engine_suite(pool: &DbPool, config: &AppConfig) -> EngineSuite {
    let repositories = EngineRepositories {
        sales: Arc::new(SqlSalesRepository::new(pool.clone())),
        stock: Arc::new(SqlStockRepository::new(pool.clone())),
        alerts: Arc::new(SqlAlertRepository::new(pool.clone())),
    };
    EngineSuite::from_config(repositories, &config.engines)
}

/// Loads config, opens the database and runs `operation` against the engine suite.
pub(crate) fn with_engine_suite<F, Fut>(command: &str, operation: F) -> CommandResult
where
    F: FnOnce(EngineSuite, AppConfig) -> Fut,
    Fut: std::future::Future<Output = CommandResult>,
{
    let config = match load_config(command) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime(command) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let pool = match open_database(&config).await {
            Ok(pool) => pool,
            Err(failure) => return CommandResult::from_step(command, failure),
        };
        let suite = engine_suite(&pool, &config);
        let result = operation(suite, config).await;
        pool.close().await;
        result
    })
}
