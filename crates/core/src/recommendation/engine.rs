use std::sync::Arc;

use serde_json::json;

use super::recommender::GroocRecommender;
use super::types::{RecommendationInput, RecommendationOutput};
use super::{ENGINE_NAME, ENGINE_VERSION};
use crate::domain::{MarketId, ProductSnapshot};
use crate::envelope::{EngineResult, ExecutionTimer};
use crate::errors::{ApplicationError, DomainError};
use crate::ports::StockRepository;
use crate::random::EngineRng;
use crate::telemetry::{PerformanceMetrics, Telemetry};

pub const EMPTY_CATALOG_MESSAGE: &str = "No products available at the moment";

/// Loads the market catalog and delegates to [`GroocRecommender`].
#[derive(Clone)]
pub struct GroocRecommendationEngine {
    recommender: GroocRecommender,
    stock: Arc<dyn StockRepository>,
    telemetry: Telemetry,
    default_market_id: MarketId,
}

enum Outcome {
    Recommended(RecommendationOutput),
    EmptyCatalog,
}

impl GroocRecommendationEngine {
    pub fn new(
        stock: Arc<dyn StockRepository>,
        telemetry: Telemetry,
        rng: EngineRng,
        default_market_id: impl Into<MarketId>,
    ) -> Self {
        Self {
            recommender: GroocRecommender::new(rng),
            stock,
            telemetry,
            default_market_id: default_market_id.into(),
        }
    }

    pub async fn recommend(&self, input: RecommendationInput) -> EngineResult<RecommendationOutput> {
        let timer = ExecutionTimer::start();
        let market_id = input.market_id.clone().unwrap_or_else(|| self.default_market_id.clone());
        self.telemetry.logs().info(
            ENGINE_NAME,
            "recommendation started",
            json!({
                "market_id": market_id,
                "requested": input.products.len(),
                "has_location": input.location.is_some(),
                "has_preferences": input.preferences.is_some(),
                "has_history": input.history.is_some(),
            }),
        );

        match self.run(&input, &market_id).await {
            Ok(Outcome::Recommended(output)) => {
                let metadata = timer.metadata(ENGINE_NAME, ENGINE_VERSION);
                self.telemetry.metrics().record(
                    ENGINE_NAME,
                    PerformanceMetrics::new(metadata.execution_time_ms, input.products.len(), 1.0),
                );
                self.telemetry.logs().info(
                    ENGINE_NAME,
                    "recommendation completed",
                    json!({
                        "recommendations": output.recommendations.len(),
                        "estimated_savings": output.estimated_savings,
                        "execution_time_ms": metadata.execution_time_ms,
                    }),
                );
                EngineResult::ok(output, metadata)
            }
            Ok(Outcome::EmptyCatalog) => {
                self.telemetry.logs().warn(
                    ENGINE_NAME,
                    "no products available in market",
                    json!({ "market_id": market_id }),
                );
                EngineResult::failed(EMPTY_CATALOG_MESSAGE, timer.metadata(ENGINE_NAME, ENGINE_VERSION))
            }
            Err(error) => {
                let metadata = timer.metadata(ENGINE_NAME, ENGINE_VERSION);
                self.telemetry.logs().error(
                    ENGINE_NAME,
                    "recommendation failed",
                    json!({ "market_id": market_id, "error": error.to_string() }),
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
        input: &RecommendationInput,
        market_id: &MarketId,
    ) -> Result<Outcome, ApplicationError> {
        validate(input)?;

        let catalog: Vec<ProductSnapshot> =
            self.stock.stock_by_market(market_id).await?.into_values().flatten().collect();
        if catalog.is_empty() {
            return Ok(Outcome::EmptyCatalog);
        }

        Ok(Outcome::Recommended(self.recommender.recommend(input, &catalog)))
    }
}

fn validate(input: &RecommendationInput) -> Result<(), DomainError> {
    if input.products.is_empty() {
        return Err(DomainError::InvalidInput("at least one product is required".to_string()));
    }
    if input.products.iter().any(|request| request.name.trim().is_empty()) {
        return Err(DomainError::InvalidInput("product name is required".to_string()));
    }
    if input.products.iter().any(|request| request.quantity == 0) {
        return Err(DomainError::InvalidInput("quantity must be greater than zero".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::domain::{MarketId, UnitId};
    use crate::random::EngineRng;
    use crate::recommendation::{
        GroocRecommendationEngine, ProductRequest, RecommendationInput, RecommendationPriority,
        UserPreferences, ENGINE_NAME,
    };
    use crate::telemetry::{LogFilter, LogLevel, Telemetry};
    use crate::testing::{product, FakeStock};

    fn engine(stock: Arc<FakeStock>, telemetry: Telemetry) -> GroocRecommendationEngine {
        GroocRecommendationEngine::new(stock, telemetry, EngineRng::fixed(0.5), "market-1")
    }

    #[tokio::test]
    async fn catalog_spans_every_unit_in_market() {
        let mut other_unit = product("p-2", "Arroz Integral", Some("Mercearia"), 22.0, 40);
        other_unit.unit_id = UnitId::from("unit-2");
        let mut other_market = product("p-3", "Arroz Agulhinha", Some("Mercearia"), 18.0, 40);
        other_market.market_id = MarketId::from("market-2");
        let stock = Arc::new(FakeStock::with_products(vec![
            product("p-1", "Arroz", Some("Mercearia"), 20.0, 100),
            other_unit,
            other_market,
        ]));
        let telemetry = Telemetry::silent();

        let result = engine(stock, telemetry.clone())
            .recommend(RecommendationInput::new(vec![ProductRequest::new("Arroz", 1)]))
            .await;

        assert!(result.success);
        assert_eq!(result.metadata.engine_name, "GROOCEngine");
        assert_eq!(result.metadata.version, "2.0.0-enhanced");
        let output = result.data.expect("output");
        let mut ids: Vec<&str> =
            output.recommendations.iter().map(|recommendation| recommendation.product_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["p-1", "p-2"]);

        let stats = telemetry.metrics().stats(ENGINE_NAME).expect("metrics");
        assert_eq!(stats.total_items_processed, 1);
    }

    #[tokio::test]
    async fn results_come_back_by_priority_then_price_within_the_tie_band() {
        let mut promo = product("p-2", "Arroz Parboilizado", Some("Mercearia"), 12.0, 30);
        promo.promo_price = Some(9.0);
        promo.brand = Some("Tio Joao".to_string());
        let stock = Arc::new(FakeStock::with_products(vec![
            product("p-1", "Arroz", Some("Mercearia"), 17.0, 100),
            promo,
            product("p-3", "Arroz Integral", Some("Mercearia"), 22.0, 4),
            product("p-4", "Arroz Branco", Some("Mercearia"), 14.0, 40),
        ]));
        let mut input = RecommendationInput::new(vec![ProductRequest::new("Arroz", 1).with_max_price(25.0)]);
        input.preferences =
            Some(UserPreferences { preferred_brands: vec!["Tio Joao".to_string()], ..UserPreferences::default() });

        let output = engine(stock, Telemetry::silent()).recommend(input).await.data.expect("output");

        let ranked: Vec<(&str, u8, RecommendationPriority)> = output
            .recommendations
            .iter()
            .map(|recommendation| {
                (recommendation.product_id.as_str(), recommendation.scores.total, recommendation.priority)
            })
            .collect();
        // p-4 scores one point under p-1 but is cheaper, so it wins the tie
        assert_eq!(
            ranked,
            vec![
                ("p-2", 82, RecommendationPriority::High),
                ("p-4", 63, RecommendationPriority::Medium),
                ("p-1", 64, RecommendationPriority::Medium),
                ("p-3", 52, RecommendationPriority::Low),
            ]
        );
    }

    #[tokio::test]
    async fn explicit_market_overrides_default() {
        let mut elsewhere = product("p-9", "Cafe", Some("Mercearia"), 15.0, 10);
        elsewhere.market_id = MarketId::from("market-2");
        let stock = Arc::new(FakeStock::with_products(vec![elsewhere]));

        let mut input = RecommendationInput::new(vec![ProductRequest::new("Cafe", 1)]);
        input.market_id = Some(MarketId::from("market-2"));
        let result = engine(stock, Telemetry::silent()).recommend(input).await;

        assert!(result.success);
        assert_eq!(result.data.expect("output").recommendations.len(), 1);
    }

    #[tokio::test]
    async fn empty_catalog_returns_descriptive_failure() {
        let telemetry = Telemetry::silent();
        let result = engine(Arc::new(FakeStock::default()), telemetry.clone())
            .recommend(RecommendationInput::new(vec![ProductRequest::new("Arroz", 1)]))
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No products available at the moment"));
        let warnings = telemetry.logs().logs(&LogFilter {
            level: Some(LogLevel::Warn),
            ..LogFilter::default()
        });
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn catalog_failure_is_enveloped() {
        let stock = Arc::new(FakeStock::default());
        stock.fail_with("catalog offline");

        let result = engine(stock, Telemetry::silent())
            .recommend(RecommendationInput::new(vec![ProductRequest::new("Arroz", 1)]))
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("persistence failure: catalog offline"));
    }

    #[tokio::test]
    async fn empty_shopping_list_is_rejected() {
        let stock = Arc::new(FakeStock::with_products(vec![product("p-1", "Arroz", None, 5.0, 5)]));
        let result = engine(stock, Telemetry::silent()).recommend(RecommendationInput::new(Vec::new())).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("invalid input: at least one product is required"));
    }
}
