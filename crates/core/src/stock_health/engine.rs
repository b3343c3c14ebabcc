use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use super::analyzer::{category_label, matches_categories, StockHealthAnalyzer};
use super::types::{StockHealthInput, StockHealthReport};
use super::{
    DEFAULT_CATEGORY_TURNOVER, ENGINE_NAME, ENGINE_VERSION, FAILED_LOOKUP_TURNOVER,
    MAX_CATEGORY_TURNOVER, TURNOVER_WINDOW_DAYS, UNCATEGORIZED,
};
use crate::config::EngineConfig;
use crate::domain::{AlertPriority, AlertType, PersistedAlert, ProductSnapshot};
use crate::envelope::{EngineResult, ExecutionTimer};
use crate::errors::ApplicationError;
use crate::ports::{AlertRepository, StockRepository};
use crate::random::EngineRng;
use crate::telemetry::{PerformanceMetrics, Telemetry};

/// Orchestrates fetch, analysis and alert persistence for one store unit.
#[derive(Clone)]
pub struct StockHealthEngine {
    analyzer: StockHealthAnalyzer,
    stock: Arc<dyn StockRepository>,
    alerts: Arc<dyn AlertRepository>,
    telemetry: Telemetry,
    persist_limit: usize,
    alert_ttl: Duration,
}

impl StockHealthEngine {
    pub fn new(
        stock: Arc<dyn StockRepository>,
        alerts: Arc<dyn AlertRepository>,
        telemetry: Telemetry,
        rng: EngineRng,
    ) -> Self {
        let defaults = EngineConfig::default();
        Self {
            analyzer: StockHealthAnalyzer::new(rng),
            stock,
            alerts,
            telemetry,
            persist_limit: defaults.alert_persist_limit,
            alert_ttl: Duration::days(defaults.alert_ttl_days),
        }
    }

    pub fn with_alert_policy(mut self, persist_limit: usize, ttl_days: i64) -> Self {
        self.persist_limit = persist_limit;
        self.alert_ttl = Duration::days(ttl_days);
        self
    }

    pub async fn analyze(&self, input: StockHealthInput) -> EngineResult<StockHealthReport> {
        let timer = ExecutionTimer::start();
        self.telemetry.logs().info(
            ENGINE_NAME,
            "stock health analysis started",
            json!({ "unit_id": input.unit_id, "market_id": input.market_id }),
        );

        match self.run(&input).await {
            Ok((report, items)) => {
                let metadata = timer.metadata(ENGINE_NAME, ENGINE_VERSION);
                self.telemetry.metrics().record(
                    ENGINE_NAME,
                    PerformanceMetrics::new(metadata.execution_time_ms, items, 1.0),
                );
                self.telemetry.logs().info(
                    ENGINE_NAME,
                    "stock health analysis completed",
                    json!({
                        "unit_id": input.unit_id,
                        "score": report.score,
                        "status": report.status,
                        "alerts": report.alerts.len(),
                        "critical_alerts": report
                            .alerts
                            .iter()
                            .filter(|alert| alert.priority == AlertPriority::Critical)
                            .count(),
                        "execution_time_ms": metadata.execution_time_ms,
                    }),
                );
                EngineResult::ok(report, metadata)
            }
            Err(error) => {
                let metadata = timer.metadata(ENGINE_NAME, ENGINE_VERSION);
                self.telemetry.logs().error(
                    ENGINE_NAME,
                    "stock health analysis failed",
                    json!({ "unit_id": input.unit_id, "error": error.to_string() }),
                );
                self.telemetry
                    .metrics()
                    .record(ENGINE_NAME, PerformanceMetrics::new(metadata.execution_time_ms, 0, 0.0));
                EngineResult::failed(error.to_string(), metadata)
            }
        }
    }

    async fn run(
        &self,
        input: &StockHealthInput,
    ) -> Result<(StockHealthReport, usize), ApplicationError> {
        let stock = self.stock.stock_by_unit(&input.unit_id).await?;
        if stock.is_empty() {
            self.telemetry.logs().warn(
                ENGINE_NAME,
                "no products found for unit",
                json!({ "unit_id": input.unit_id }),
            );
        }

        let turnover = self.category_turnover(input, &stock).await;
        let report = self.analyzer.analyze(input, &stock, &turnover);
        self.persist_alerts(input, &report).await;

        Ok((report, stock.len()))
    }

    /// Monthly turnover per category: units sold over the trailing window divided by
    /// the mean on-hand quantity, clamped to `[0, MAX_CATEGORY_TURNOVER]`.
    async fn category_turnover(
        &self,
        input: &StockHealthInput,
        stock: &[ProductSnapshot],
    ) -> BTreeMap<String, f64> {
        let mut quantities: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for product in stock.iter().filter(|product| matches_categories(input, product)) {
            quantities.entry(category_label(product)).or_default().push(f64::from(product.quantity));
        }

        let mut turnover = BTreeMap::new();
        for (category, values) in quantities {
            if category == UNCATEGORIZED {
                continue;
            }

            let mean_stock = values.iter().sum::<f64>() / values.len() as f64;
            let value = match self
                .stock
                .category_units_sold(&input.unit_id, category, TURNOVER_WINDOW_DAYS)
                .await
            {
                Ok(Some(units_sold)) if mean_stock > 0.0 => {
                    (units_sold / mean_stock).clamp(0.0, MAX_CATEGORY_TURNOVER)
                }
                Ok(_) => DEFAULT_CATEGORY_TURNOVER,
                Err(error) => {
                    self.telemetry.logs().warn(
                        ENGINE_NAME,
                        "category turnover lookup failed",
                        json!({ "category": category, "error": error.to_string() }),
                    );
                    FAILED_LOOKUP_TURNOVER
                }
            };
            turnover.insert(category.to_string(), value);
        }
        turnover
    }

    async fn persist_alerts(&self, input: &StockHealthInput, report: &StockHealthReport) {
        let created_at = Utc::now();
        let rows: Vec<PersistedAlert> = report
            .alerts
            .iter()
            .take(self.persist_limit)
            .map(|alert| {
                PersistedAlert::from_stock_alert(
                    Uuid::new_v4().to_string(),
                    input.market_id.clone(),
                    input.unit_id.clone(),
                    alert,
                    created_at,
                    self.alert_ttl,
                )
            })
            .collect();

        match self.replace_alerts(input, rows).await {
            Ok(0) => {}
            Ok(count) => self.telemetry.logs().info(
                ENGINE_NAME,
                "alerts stored",
                json!({ "market_id": input.market_id, "unit_id": input.unit_id, "alerts": count }),
            ),
            Err(error) => self.telemetry.logs().error(
                ENGINE_NAME,
                "failed to store alerts",
                json!({
                    "market_id": input.market_id,
                    "unit_id": input.unit_id,
                    "error": error.to_string(),
                }),
            ),
        }
    }

    /// Drops the unit's previous stock-health alerts and stores `rows` in their place.
    async fn replace_alerts(
        &self,
        input: &StockHealthInput,
        rows: Vec<PersistedAlert>,
    ) -> Result<usize, ApplicationError> {
        self.alerts
            .delete_alerts(&input.market_id, &input.unit_id, &AlertType::STOCK_HEALTH)
            .await?;
        let count = rows.len();
        if count > 0 {
            self.alerts.insert_alerts(rows).await?;
        }
        Ok(count)
    }
}
