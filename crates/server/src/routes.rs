use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use precivox_core::demand::{summarize_batch, BatchSummary, DemandForecast, DemandInput};
use precivox_core::domain::{ProductId, UnitId};
use precivox_core::envelope::EngineResult;
use precivox_core::errors::{ApplicationError, DomainError, InterfaceError, InterfaceErrorKind};
use precivox_core::pricing::{PricingInput, PricingRecommendation};
use precivox_core::recommendation::{RecommendationInput, RecommendationOutput};
use precivox_core::services::{SalesInsights, StockHistory};
use precivox_core::stock_health::{StockHealthInput, StockHealthReport};
use precivox_core::suite::EngineSuite;
use precivox_core::telemetry::{EngineStats, LogEntry, LogFilter, LogLevel, LogStats};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

const DEFAULT_WINDOW_DAYS: u32 = 30;
const DEFAULT_CORRELATION_LIMIT: usize = 5;

#[derive(Clone)]
pub struct AppState {
    suite: EngineSuite,
}

pub fn router(suite: EngineSuite) -> Router {
    Router::new()
        .route("/ai/demand", post(predict_demand))
        .route("/ai/demand/batch", post(predict_demand_batch))
        .route("/ai/stock-health", post(analyze_stock_health))
        .route("/ai/pricing", post(analyze_pricing))
        .route("/ai/recommendations", post(recommend))
        .route("/ai/sales/{product_id}/insights", get(sales_insights))
        .route("/ai/stock/{product_id}/history", get(stock_history))
        .route("/ai/telemetry/logs", get(telemetry_logs))
        .route("/ai/telemetry/metrics/{engine}", get(engine_metrics))
        .with_state(AppState { suite })
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn invalid_input(message: impl Into<String>) -> Self {
        ApplicationError::from(DomainError::InvalidInput(message.into())).into()
    }

    fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                error: "The requested resource was not found.".to_string(),
                detail: detail.into(),
                correlation_id: new_correlation_id(),
            },
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        error.into_interface(new_correlation_id()).into()
    }
}

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        let status = match error.kind {
            InterfaceErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            InterfaceErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            body: ErrorBody {
                error: error.user_message().to_string(),
                detail: error.to_string(),
                correlation_id: error.correlation_id.clone(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(
            event_name = "server.request.rejected",
            correlation_id = %self.body.correlation_id,
            status = self.status.as_u16(),
            detail = %self.body.detail,
            "request rejected"
        );
        (self.status, Json(self.body)).into_response()
    }
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// A failed envelope is still a well-formed answer, reported as 422.
fn envelope<T: Serialize>(result: EngineResult<T>) -> (StatusCode, Json<EngineResult<T>>) {
    let status = if result.success { StatusCode::OK } else { StatusCode::UNPROCESSABLE_ENTITY };
    (status, Json(result))
}

async fn predict_demand(
    State(state): State<AppState>,
    Json(input): Json<DemandInput>,
) -> (StatusCode, Json<EngineResult<DemandForecast>>) {
    envelope(state.suite.demand.predict(input).await)
}

#[derive(Debug, Deserialize)]
pub struct DemandBatchRequest {
    pub items: Vec<DemandInput>,
}

#[derive(Debug, Serialize)]
pub struct DemandBatchResponse {
    pub results: Vec<EngineResult<DemandForecast>>,
    pub summary: BatchSummary,
}

async fn predict_demand_batch(
    State(state): State<AppState>,
    Json(request): Json<DemandBatchRequest>,
) -> Result<Json<DemandBatchResponse>, ApiError> {
    if request.items.is_empty() {
        return Err(ApiError::invalid_input("batch must contain at least one item"));
    }

    let results = state.suite.demand.predict_batch(request.items).await;
    let summary = summarize_batch(&results);
    Ok(Json(DemandBatchResponse { results, summary }))
}

async fn analyze_stock_health(
    State(state): State<AppState>,
    Json(input): Json<StockHealthInput>,
) -> (StatusCode, Json<EngineResult<StockHealthReport>>) {
    envelope(state.suite.stock_health.analyze(input).await)
}

async fn analyze_pricing(
    State(state): State<AppState>,
    Json(input): Json<PricingInput>,
) -> (StatusCode, Json<EngineResult<PricingRecommendation>>) {
    envelope(state.suite.pricing.analyze(input).await)
}

async fn recommend(
    State(state): State<AppState>,
    Json(input): Json<RecommendationInput>,
) -> Result<(StatusCode, Json<EngineResult<RecommendationOutput>>), ApiError> {
    if input.products.is_empty() {
        return Err(ApiError::invalid_input("at least one product is required"));
    }
    Ok(envelope(state.suite.grooc.recommend(input).await))
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub unit_id: Option<String>,
    pub days: Option<u32>,
    pub limit: Option<usize>,
}

impl WindowQuery {
    fn unit(&self) -> Result<UnitId, ApiError> {
        self.unit_id
            .as_deref()
            .filter(|unit| !unit.is_empty())
            .map(UnitId::from)
            .ok_or_else(|| ApiError::invalid_input("unit_id is required"))
    }

    fn days(&self) -> u32 {
        self.days.unwrap_or(DEFAULT_WINDOW_DAYS)
    }
}

async fn sales_insights(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<SalesInsights>, ApiError> {
    let unit_id = query.unit()?;
    let limit = query.limit.unwrap_or(DEFAULT_CORRELATION_LIMIT);
    let insights = state
        .suite
        .sales
        .insights(&ProductId::from(product_id), &unit_id, query.days(), limit)
        .await?;
    Ok(Json(insights))
}

async fn stock_history(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<StockHistory>, ApiError> {
    let unit_id = query.unit()?;
    let history =
        state.suite.stock.stock_history(&ProductId::from(product_id), &unit_id, query.days()).await?;
    Ok(Json(history))
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub engine: Option<String>,
    pub level: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
    pub stats: LogStats,
}

async fn telemetry_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let level = query
        .level
        .as_deref()
        .map(str::parse::<LogLevel>)
        .transpose()
        .map_err(ApiError::invalid_input)?;
    let filter = LogFilter { engine: query.engine, level, limit: query.limit };

    let logs = state.suite.telemetry().logs();
    Ok(Json(LogsResponse { logs: logs.logs(&filter), stats: logs.stats() }))
}

async fn engine_metrics(
    State(state): State<AppState>,
    Path(engine): Path<String>,
) -> Result<Json<EngineStats>, ApiError> {
    state
        .suite
        .telemetry()
        .metrics()
        .stats(&engine)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no metrics recorded for engine `{engine}`")))
}
