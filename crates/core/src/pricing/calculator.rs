use crate::domain::{ProductId, UnitId};
use crate::random::EngineRng;
use crate::services::round2;

use super::types::{
    ActionPriority, Competitiveness, MarketPosition, PriceImpact, PricingAction, PricingActionType,
    PricingRecommendation,
};

const ELASTICITY_RANGE: (f64, f64) = (-1.8, -0.8);
const MARKET_SPREAD: (f64, f64) = (0.9, 1.1);
const OPTIMAL_TO_MARKET: f64 = 0.95;
const MORE_EXPENSIVE_FACTOR: f64 = 1.1;
const MARGIN_SHARE_OF_REVENUE: f64 = 0.8;
const HIGH_PRIORITY_PRICE_CHANGE_PCT: f64 = 10.0;
const ACTION_CONFIDENCE: f64 = 0.7;

/// Heuristic pricing model.
///
/// Elasticity and the reference market price are synthetic draws around the current
/// price; [`crate::services::SalesDataService::price_elasticity`] is the estimator
/// backed by sales history and is not used here.
#[derive(Clone, Debug)]
pub struct PricingCalculator {
    rng: EngineRng,
}

impl PricingCalculator {
    pub fn new(rng: EngineRng) -> Self {
        Self { rng }
    }

    /// `current_price` must be positive; the engine validates it first.
    pub fn calculate(
        &self,
        product_id: &ProductId,
        unit_id: Option<&UnitId>,
        current_price: f64,
    ) -> PricingRecommendation {
        let elasticity = self.rng.uniform(ELASTICITY_RANGE.0, ELASTICITY_RANGE.1);
        let market_price = current_price * self.rng.uniform(MARKET_SPREAD.0, MARKET_SPREAD.1);
        let optimal_price = round2(market_price * OPTIMAL_TO_MARKET);

        let impact = price_impact(current_price, optimal_price, elasticity);
        let competitiveness = Competitiveness {
            position: market_position(current_price, market_price),
            avg_diff_pct: round2((current_price - market_price) / market_price * 100.0),
            market_price: round2(market_price),
            rank: u8::try_from(self.rng.int_inclusive(1, 5)).unwrap_or(3),
        };
        let action = recommended_action(current_price, optimal_price, elasticity, &impact);

        PricingRecommendation {
            product_id: product_id.clone(),
            unit_id: unit_id.cloned(),
            elasticity: round2(elasticity),
            optimal_price,
            impact,
            competitiveness,
            actions: vec![action],
        }
    }
}

pub fn price_impact(current_price: f64, optimal_price: f64, elasticity: f64) -> PriceImpact {
    let price_pct = (optimal_price - current_price) / current_price * 100.0;
    let sales_pct = -elasticity * price_pct;
    let revenue_pct = price_pct + sales_pct;

    PriceImpact {
        price_pct: round2(price_pct),
        sales_pct: round2(sales_pct),
        revenue_pct: round2(revenue_pct),
        margin_pct: round2(revenue_pct * MARGIN_SHARE_OF_REVENUE),
    }
}

pub fn market_position(current_price: f64, market_price: f64) -> MarketPosition {
    if current_price < market_price {
        MarketPosition::Cheaper
    } else if current_price > market_price * MORE_EXPENSIVE_FACTOR {
        MarketPosition::MoreExpensive
    } else {
        MarketPosition::Competitive
    }
}

fn recommended_action(
    current_price: f64,
    optimal_price: f64,
    elasticity: f64,
    impact: &PriceImpact,
) -> PricingAction {
    let action_type =
        if optimal_price > current_price { PricingActionType::Raise } else { PricingActionType::Lower };
    let direction = if impact.revenue_pct > 0.0 { "increase" } else { "decrease" };

    PricingAction {
        action_type,
        suggested_price: optimal_price,
        rationale: format!("Optimal price based on an elasticity of {elasticity:.2}"),
        expected_impact: format!(
            "Estimated revenue {direction} of {:.1}%",
            impact.revenue_pct.abs()
        ),
        priority: if impact.price_pct.abs() > HIGH_PRIORITY_PRICE_CHANGE_PCT {
            ActionPriority::High
        } else {
            ActionPriority::Medium
        },
        confidence: ACTION_CONFIDENCE,
    }
}
