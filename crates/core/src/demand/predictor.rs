use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::calculator::DemandCalculator;
use super::types::{BatchSummary, DemandForecast, DemandInput, MAX_FORECAST_HORIZON_DAYS};
use super::{ENGINE_NAME, ENGINE_VERSION};
use crate::domain::ForecastRollup;
use crate::envelope::{EngineResult, ExecutionTimer};
use crate::errors::{ApplicationError, DomainError};
use crate::ports::{SalesRepository, StockRepository};
use crate::random::EngineRng;
use crate::telemetry::{PerformanceMetrics, Telemetry};

const MIN_RELIABLE_HISTORY: usize = 7;
const ROLLUP_SHORT_DAYS: usize = 7;

/// Fetches sales history, runs the [`DemandCalculator`] and writes forecast totals back
/// onto the product record.
#[derive(Clone)]
pub struct DemandPredictor {
    calculator: DemandCalculator,
    sales: Arc<dyn SalesRepository>,
    stock: Arc<dyn StockRepository>,
    telemetry: Telemetry,
    batch_concurrency: usize,
    today: Option<NaiveDate>,
}

impl DemandPredictor {
    pub fn new(
        sales: Arc<dyn SalesRepository>,
        stock: Arc<dyn StockRepository>,
        telemetry: Telemetry,
        rng: EngineRng,
    ) -> Self {
        Self {
            calculator: DemandCalculator::new(rng),
            sales,
            stock,
            telemetry,
            batch_concurrency: 8,
            today: None,
        }
    }

    pub fn with_batch_concurrency(mut self, limit: usize) -> Self {
        self.batch_concurrency = limit.max(1);
        self
    }

    /// Pins the date forecasts are projected from. Defaults to the current UTC date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub async fn predict(&self, input: DemandInput) -> EngineResult<DemandForecast> {
        let timer = ExecutionTimer::start();
        self.telemetry.logs().info(
            ENGINE_NAME,
            "demand prediction started",
            json!({ "product_id": input.product_id, "unit_id": input.unit_id }),
        );

        match self.run(&input).await {
            Ok(forecast) => {
                let metadata = timer.metadata(ENGINE_NAME, ENGINE_VERSION);
                self.telemetry.metrics().record(
                    ENGINE_NAME,
                    PerformanceMetrics::new(metadata.execution_time_ms, 1, 1.0),
                );
                self.telemetry.logs().info(
                    ENGINE_NAME,
                    "demand prediction completed",
                    json!({
                        "product_id": input.product_id,
                        "trend": forecast.trend,
                        "confidence": forecast.confidence,
                        "execution_time_ms": metadata.execution_time_ms,
                    }),
                );
                EngineResult::ok(forecast, metadata)
            }
            Err(error) => self.failure(&timer, &input, error.to_string()),
        }
    }

    /// Runs one prediction per input with at most `batch_concurrency` in flight.
    /// Results keep the input order; one failure never affects its siblings.
    pub async fn predict_batch(&self, inputs: Vec<DemandInput>) -> Vec<EngineResult<DemandForecast>> {
        let timer = ExecutionTimer::start();
        self.telemetry.logs().info(
            ENGINE_NAME,
            "batch demand prediction started",
            json!({ "total": inputs.len(), "concurrency": self.batch_concurrency }),
        );

        let semaphore = Arc::new(Semaphore::new(self.batch_concurrency));
        let mut tasks = JoinSet::new();
        for (index, input) in inputs.iter().cloned().enumerate() {
            let predictor = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, predictor.predict(input).await)
            });
        }

        let mut slots: Vec<Option<EngineResult<DemandForecast>>> =
            inputs.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(error) => self.telemetry.logs().error(
                    ENGINE_NAME,
                    "batch prediction task aborted",
                    json!({ "error": error.to_string() }),
                ),
            }
        }

        let results: Vec<EngineResult<DemandForecast>> = slots
            .into_iter()
            .zip(inputs.iter())
            .map(|(slot, input)| {
                slot.unwrap_or_else(|| {
                    self.failure(&timer, input, "prediction task did not complete".to_string())
                })
            })
            .collect();

        let summary = summarize_batch(&results);
        self.telemetry.logs().info(
            ENGINE_NAME,
            "batch demand prediction completed",
            json!({
                "total": summary.total,
                "succeeded": summary.succeeded,
                "failed": summary.failed,
            }),
        );
        results
    }

    async fn run(&self, input: &DemandInput) -> Result<DemandForecast, ApplicationError> {
        validate(input)?;

        let history = self
            .sales
            .sales_history(&input.product_id, &input.unit_id, input.history_window_days)
            .await?;
        if history.len() < MIN_RELIABLE_HISTORY {
            self.telemetry.logs().warn(
                ENGINE_NAME,
                "insufficient sales history",
                json!({ "product_id": input.product_id, "available_days": history.len() }),
            );
        }

        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        let forecast = self.calculator.calculate(input, &history, today);
        self.write_rollup(&forecast).await;
        Ok(forecast)
    }

    async fn write_rollup(&self, forecast: &DemandForecast) {
        let rollup = ForecastRollup {
            forecast_7d: forecast
                .daily_forecasts
                .iter()
                .take(ROLLUP_SHORT_DAYS)
                .map(|day| day.expected_qty)
                .sum(),
            forecast_30d: forecast.metrics.total_forecast,
        };

        if let Err(error) = self.stock.update_forecast_rollup(&forecast.product_id, rollup).await {
            self.telemetry.logs().error(
                ENGINE_NAME,
                "failed to store forecast rollup",
                json!({ "product_id": forecast.product_id, "error": error.to_string() }),
            );
        }
    }

    fn failure(
        &self,
        timer: &ExecutionTimer,
        input: &DemandInput,
        error: String,
    ) -> EngineResult<DemandForecast> {
        let metadata = timer.metadata(ENGINE_NAME, ENGINE_VERSION);
        self.telemetry.logs().error(
            ENGINE_NAME,
            "demand prediction failed",
            json!({ "product_id": input.product_id, "unit_id": input.unit_id, "error": error }),
        );
        self.telemetry
            .metrics()
            .record(ENGINE_NAME, PerformanceMetrics::new(metadata.execution_time_ms, 0, 0.0));
        EngineResult::failed(error, metadata)
    }
}

pub fn summarize_batch<T>(results: &[EngineResult<T>]) -> BatchSummary {
    let succeeded = results.iter().filter(|result| result.success).count();
    BatchSummary { total: results.len(), succeeded, failed: results.len() - succeeded }
}

fn validate(input: &DemandInput) -> Result<(), DomainError> {
    if input.product_id.as_str().trim().is_empty() || input.unit_id.as_str().trim().is_empty() {
        return Err(DomainError::InvalidInput("product_id and unit_id are required".to_string()));
    }
    if input.history_window_days == 0 {
        return Err(DomainError::InvalidInput(
            "history_window_days must be greater than zero".to_string(),
        ));
    }
    if input.forecast_horizon_days == 0 || input.forecast_horizon_days > MAX_FORECAST_HORIZON_DAYS {
        return Err(DomainError::InvalidInput(format!(
            "forecast_horizon_days must be in range 1..={MAX_FORECAST_HORIZON_DAYS}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate};

    use crate::demand::{DemandInput, DemandPredictor, ENGINE_NAME};
    use crate::domain::{ProductId, SalesRecord, Trend, UnitId};
    use crate::random::EngineRng;
    use crate::telemetry::{LogFilter, LogLevel, Telemetry};
    use crate::testing::{FakeSales, FakeStock};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 31).expect("valid date")
    }

    fn flat(days: i64, quantity: f64) -> Vec<SalesRecord> {
        (0..days)
            .map(|offset| SalesRecord::new(today() - Duration::days(days - offset), quantity, 0.0))
            .collect()
    }

    fn predictor(
        sales: Arc<FakeSales>,
        stock: Arc<FakeStock>,
        telemetry: Telemetry,
    ) -> DemandPredictor {
        DemandPredictor::new(sales, stock, telemetry, EngineRng::fixed(0.5)).with_today(today())
    }

    #[tokio::test]
    async fn predict_returns_envelope_and_writes_rollup() {
        let sales = Arc::new(FakeSales::default());
        sales.set_history(&ProductId::from("prod-1"), &UnitId::from("unit-1"), flat(30, 10.0));
        let stock = Arc::new(FakeStock::default());
        let telemetry = Telemetry::silent();

        let result = predictor(sales, stock.clone(), telemetry.clone())
            .predict(DemandInput::new("prod-1", "unit-1").with_horizon(10))
            .await;

        assert!(result.success);
        assert_eq!(result.metadata.engine_name, "DemandPredictor");
        assert_eq!(result.metadata.version, "1.0.0-mock");
        let forecast = result.data.expect("forecast");
        assert_eq!(forecast.daily_forecasts.len(), 10);
        assert_eq!(forecast.trend, Trend::Stable);
        assert!(forecast.confidence >= 0.8);

        let rollups = stock.rollups();
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].1.forecast_7d, 70);
        assert_eq!(rollups[0].1.forecast_30d, 100);

        let stats = telemetry.metrics().stats(ENGINE_NAME).expect("metrics");
        assert_eq!(stats.avg_success_rate, 1.0);
    }

    #[tokio::test]
    async fn history_failure_becomes_failed_envelope_with_zero_success_metric() {
        let sales = Arc::new(FakeSales::default());
        sales.fail_with("sales table locked");
        let telemetry = Telemetry::silent();

        let result = predictor(sales, Arc::new(FakeStock::default()), telemetry.clone())
            .predict(DemandInput::new("prod-1", "unit-1"))
            .await;

        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.as_deref().is_some_and(|error| error.contains("sales table locked")));
        let stats = telemetry.metrics().stats(ENGINE_NAME).expect("metrics");
        assert_eq!(stats.avg_success_rate, 0.0);
        assert_eq!(stats.total_items_processed, 0);
        let errors = telemetry.logs().logs(&LogFilter {
            engine: Some(ENGINE_NAME.to_string()),
            level: Some(LogLevel::Error),
            limit: None,
        });
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn rollup_failure_does_not_fail_prediction() {
        let sales = Arc::new(FakeSales::default());
        sales.set_history(&ProductId::from("prod-1"), &UnitId::from("unit-1"), flat(30, 4.0));
        let stock = Arc::new(FakeStock::default());
        stock.fail_rollups();
        let telemetry = Telemetry::silent();

        let result = predictor(sales, stock, telemetry.clone())
            .predict(DemandInput::new("prod-1", "unit-1"))
            .await;

        assert!(result.success);
        let errors = telemetry.logs().logs(&LogFilter {
            level: Some(LogLevel::Error),
            ..LogFilter::default()
        });
        assert!(errors.iter().any(|entry| entry.message.contains("forecast rollup")));
    }

    #[tokio::test]
    async fn short_history_warns_and_lowers_confidence() {
        let sales = Arc::new(FakeSales::default());
        sales.set_history(&ProductId::from("prod-1"), &UnitId::from("unit-1"), flat(3, 6.0));
        let telemetry = Telemetry::silent();

        let result = predictor(sales, Arc::new(FakeStock::default()), telemetry.clone())
            .predict(DemandInput::new("prod-1", "unit-1"))
            .await;

        let forecast = result.data.expect("forecast");
        assert!((forecast.confidence - 0.7).abs() < 1e-9);
        let warnings = telemetry.logs().logs(&LogFilter {
            level: Some(LogLevel::Warn),
            ..LogFilter::default()
        });
        assert!(warnings.iter().any(|entry| entry.message == "insufficient sales history"));
    }

    #[tokio::test]
    async fn invalid_horizon_is_rejected_as_failed_envelope() {
        let result = predictor(
            Arc::new(FakeSales::default()),
            Arc::new(FakeStock::default()),
            Telemetry::silent(),
        )
        .predict(DemandInput::new("prod-1", "unit-1").with_horizon(0))
        .await;

        assert!(!result.success);
        assert!(result.error.as_deref().is_some_and(|error| error.contains("forecast_horizon_days")));
    }

    #[tokio::test]
    async fn batch_keeps_input_order_and_isolates_failures() {
        let sales = Arc::new(FakeSales::default());
        for id in ["prod-1", "prod-2", "prod-3"] {
            sales.set_history(&ProductId::from(id), &UnitId::from("unit-1"), flat(14, 5.0));
        }
        let telemetry = Telemetry::silent();
        let predictor = predictor(sales, Arc::new(FakeStock::default()), telemetry.clone())
            .with_batch_concurrency(2);

        let results = predictor
            .predict_batch(vec![
                DemandInput::new("prod-1", "unit-1"),
                DemandInput::new("prod-2", "unit-1").with_horizon(0),
                DemandInput::new("prod-3", "unit-1"),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
        assert_eq!(
            results[2].data.as_ref().map(|forecast| forecast.product_id.as_str()),
            Some("prod-3")
        );

        let summary = super::summarize_batch(&results);
        assert_eq!((summary.total, summary.succeeded, summary.failed), (3, 2, 1));
        let stats = telemetry.metrics().stats(ENGINE_NAME).expect("metrics");
        assert_eq!(stats.total_executions, 3);
    }
}
