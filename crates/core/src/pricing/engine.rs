use serde_json::json;

use super::calculator::PricingCalculator;
use super::types::{PricingInput, PricingRecommendation};
use super::{ENGINE_NAME, ENGINE_VERSION};
use crate::envelope::{EngineResult, ExecutionTimer};
use crate::errors::DomainError;
use crate::random::EngineRng;
use crate::telemetry::{PerformanceMetrics, Telemetry};

/// Envelope wrapper around [`PricingCalculator`]. Needs no collaborators.
#[derive(Clone)]
pub struct SmartPricingEngine {
    calculator: PricingCalculator,
    telemetry: Telemetry,
}

impl SmartPricingEngine {
    pub fn new(telemetry: Telemetry, rng: EngineRng) -> Self {
        Self { calculator: PricingCalculator::new(rng), telemetry }
    }

    pub async fn analyze(&self, input: PricingInput) -> EngineResult<PricingRecommendation> {
        let timer = ExecutionTimer::start();
        self.telemetry.logs().info(
            ENGINE_NAME,
            "pricing analysis started",
            json!({ "product_id": input.product_id, "unit_id": input.unit_id }),
        );

        let current_price = match validate(&input) {
            Ok(price) => price,
            Err(error) => {
                let metadata = timer.metadata(ENGINE_NAME, ENGINE_VERSION);
                self.telemetry.logs().error(
                    ENGINE_NAME,
                    "pricing analysis failed",
                    json!({ "product_id": input.product_id, "error": error.to_string() }),
                );
                self.telemetry
                    .metrics()
                    .record(ENGINE_NAME, PerformanceMetrics::new(metadata.execution_time_ms, 0, 0.0));
                return EngineResult::failed(error.to_string(), metadata);
            }
        };

        let recommendation =
            self.calculator.calculate(&input.product_id, input.unit_id.as_ref(), current_price);
        if let Some(cost) = input.cost {
            if recommendation.optimal_price < cost {
                self.telemetry.logs().warn(
                    ENGINE_NAME,
                    "optimal price is below unit cost",
                    json!({
                        "product_id": input.product_id,
                        "optimal_price": recommendation.optimal_price,
                        "cost": cost,
                    }),
                );
            }
        }

        let metadata = timer.metadata(ENGINE_NAME, ENGINE_VERSION);
        self.telemetry
            .metrics()
            .record(ENGINE_NAME, PerformanceMetrics::new(metadata.execution_time_ms, 1, 1.0));
        self.telemetry.logs().info(
            ENGINE_NAME,
            "pricing analysis completed",
            json!({
                "product_id": input.product_id,
                "optimal_price": recommendation.optimal_price,
                "position": recommendation.competitiveness.position,
                "execution_time_ms": metadata.execution_time_ms,
            }),
        );
        EngineResult::ok(recommendation, metadata)
    }
}

fn validate(input: &PricingInput) -> Result<f64, DomainError> {
    if input.product_id.as_str().trim().is_empty() {
        return Err(DomainError::InvalidInput("product_id is required".to_string()));
    }
    if input.cost.is_some_and(|cost| !cost.is_finite() || cost < 0.0) {
        return Err(DomainError::InvalidInput("cost must not be negative".to_string()));
    }
    match input.current_price {
        Some(price) if price.is_finite() && price > 0.0 => Ok(price),
        Some(_) => Err(DomainError::InvalidInput("current_price must be greater than zero".to_string())),
        None => Err(DomainError::InvalidInput("current_price is required".to_string())),
    }
}
