use std::cmp::Ordering;

use crate::domain::{ProductSnapshot, UnitId};
use crate::random::EngineRng;
use crate::services::round2;

use super::scoring::{contains_any, first_word, normalize, ScoreCalculator, ScoringWeights};
use super::types::{
    GeoPoint, HealthAttributes, ProductRecommendation, ProductRequest, RecommendationInput,
    RecommendationOutput, RecommendationPriority, RecommendationScores, RecommendationSummary,
    RecommendationType, RouteOptimization, RouteStop, UserHistory, UserPreferences,
};
use super::{DEFAULT_TIME_ESTIMATE_MINUTES, MAX_CANDIDATES_PER_REQUEST};

const REFERENCE_PRICE_MARKUP: f64 = 1.2;
const SCORE_TIE_BAND: u8 = 5;
const MOCK_DISTANCE_KM: f64 = 10.0;
const STOP_DISTANCE_KM: (f64, f64) = (1.0, 6.0);
const MINUTES_PER_KM: f64 = 3.0;
const MINUTES_PER_STOP: f64 = 10.0;
const COORDINATE_JITTER: f64 = 0.02;

/// Matches shopping-list requests against a catalog, scores and ranks the
/// candidates and optionally plans a multi-store route.
#[derive(Clone, Debug)]
pub struct GroocRecommender {
    rng: EngineRng,
}

impl GroocRecommender {
    pub fn new(rng: EngineRng) -> Self {
        Self { rng }
    }

    pub fn recommend(
        &self,
        input: &RecommendationInput,
        catalog: &[ProductSnapshot],
    ) -> RecommendationOutput {
        let preferences = input.preferences.clone().unwrap_or_default();
        let calculator = ScoreCalculator::with_weights(ScoringWeights::for_preferences(&preferences));

        let mut recommendations: Vec<ProductRecommendation> = input
            .products
            .iter()
            .flat_map(|request| {
                self.best_matches(request, catalog, &preferences, input.history.as_ref(), &calculator)
            })
            .collect();
        if !preferences.accepts_substitutes {
            recommendations
                .retain(|recommendation| recommendation.recommendation_type != RecommendationType::Substitute);
        }
        sort_recommendations(&mut recommendations, &preferences);

        let route = input
            .location
            .map(|location| self.optimize_route(&recommendations, location, &preferences));
        let estimated_savings =
            round2(recommendations.iter().map(|recommendation| recommendation.savings_value).sum());
        let estimated_time_minutes = route
            .as_ref()
            .map(|route| route.total_eta_minutes)
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_TIME_ESTIMATE_MINUTES);
        let summary = summarize(&input.products, &recommendations);

        RecommendationOutput {
            recommendations,
            route,
            estimated_savings,
            estimated_time_minutes,
            summary,
        }
    }

    fn best_matches(
        &self,
        request: &ProductRequest,
        catalog: &[ProductSnapshot],
        preferences: &UserPreferences,
        history: Option<&UserHistory>,
        calculator: &ScoreCalculator,
    ) -> Vec<ProductRecommendation> {
        candidates(request, catalog, preferences)
            .into_iter()
            .take(MAX_CANDIDATES_PER_REQUEST)
            .map(|product| {
                let scores = calculator.score(product, request, preferences, history);
                self.build(request, product, scores)
            })
            .collect()
    }

    fn build(
        &self,
        request: &ProductRequest,
        product: &ProductSnapshot,
        scores: RecommendationScores,
    ) -> ProductRecommendation {
        let price = product.price;
        let (savings_value, savings_pct) = savings(price, request);

        ProductRecommendation {
            original_query: request.name.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            recommendation_type: recommendation_type(product, &scores),
            suggested_unit: product.unit_id.clone(),
            unit_name: unit_name(&product.unit_id),
            price,
            original_price: product.is_on_promotion().then_some(price),
            savings_value,
            savings_pct,
            distance_km: Some(round2(self.rng.unit() * MOCK_DISTANCE_KM)),
            stock_qty: product.quantity,
            brand: product
                .brand
                .clone()
                .filter(|brand| !brand.is_empty())
                .unwrap_or_else(|| "No brand".to_string()),
            category: product.category.clone().unwrap_or_else(|| "General".to_string()),
            justifications: justifications(product, &scores, savings_value, savings_pct),
            health_attributes: self.health_attributes(&product.name),
            confidence: f64::from(scores.total) / 100.0,
            priority: RecommendationPriority::from_total(scores.total),
            scores,
        }
    }

    /// Label flags come from the name; nutrition figures are placeholders drawn from
    /// the random source.
    fn health_attributes(&self, product_name: &str) -> HealthAttributes {
        let name = normalize(product_name);
        let draw = |lo: i64, hi: i64| u32::try_from(self.rng.int_inclusive(lo, hi)).ok();

        HealthAttributes {
            calories: draw(50, 349),
            fat: draw(0, 19),
            sugar: draw(0, 29),
            sodium: draw(0, 499),
            organic: contains_any(&name, &["orgânico", "organico", "organic"]),
            whole_grain: contains_any(&name, &["integral", "whole grain", "wholegrain"]),
            gluten_free: contains_any(&name, &["sem glúten", "sem gluten", "gluten free", "gluten-free"]),
            lactose_free: contains_any(&name, &["sem lactose", "lactose free", "lactose-free"]),
            vegan: contains_any(&name, &["vegano", "vegan"]),
        }
    }

    fn optimize_route(
        &self,
        recommendations: &[ProductRecommendation],
        location: GeoPoint,
        preferences: &UserPreferences,
    ) -> RouteOptimization {
        let mut groups: Vec<(UnitId, Vec<ProductRecommendation>)> = Vec::new();
        for recommendation in recommendations {
            match groups.iter_mut().find(|(unit, _)| unit == &recommendation.suggested_unit) {
                Some((_, members)) => members.push(recommendation.clone()),
                None => groups.push((recommendation.suggested_unit.clone(), vec![recommendation.clone()])),
            }
        }

        let mut stops: Vec<RouteStop> = groups
            .into_iter()
            .map(|(unit_id, products)| {
                let distance_km = round2(self.rng.uniform(STOP_DISTANCE_KM.0, STOP_DISTANCE_KM.1));
                let name = unit_name(&unit_id);
                RouteStop {
                    address: format!("Address of {name}"),
                    unit_name: name,
                    unit_id,
                    order: 0,
                    distance_km,
                    eta_minutes: (distance_km * MINUTES_PER_KM + MINUTES_PER_STOP).round() as u32,
                    cumulative_savings: round2(
                        products.iter().map(|product| product.savings_value).sum(),
                    ),
                    latitude: Some(location.latitude + (self.rng.unit() - 0.5) * COORDINATE_JITTER),
                    longitude: Some(location.longitude + (self.rng.unit() - 0.5) * COORDINATE_JITTER),
                    products,
                }
            })
            .collect();

        if preferences.prefers_shorter_distance {
            stops.sort_by(|left, right| left.distance_km.total_cmp(&right.distance_km));
        } else {
            stops.sort_by(|left, right| right.cumulative_savings.total_cmp(&left.cumulative_savings));
        }
        for (index, stop) in stops.iter_mut().enumerate() {
            stop.order = index as u32 + 1;
        }

        let total_distance_km = round2(stops.iter().map(|stop| stop.distance_km).sum());
        let total_savings = round2(stops.iter().map(|stop| stop.cumulative_savings).sum());
        RouteOptimization {
            total_eta_minutes: stops.iter().map(|stop| stop.eta_minutes).sum(),
            efficiency: if total_distance_km > 0.0 {
                round2(total_savings / total_distance_km)
            } else {
                0.0
            },
            total_distance_km,
            total_savings,
            is_optimized: true,
            stops,
        }
    }
}

/// Catalog items eligible for one request, in catalog order and before the cap.
pub fn candidates<'a>(
    request: &ProductRequest,
    catalog: &'a [ProductSnapshot],
    preferences: &UserPreferences,
) -> Vec<&'a ProductSnapshot> {
    let query = normalize(&request.name);
    let in_category = |product: &ProductSnapshot| match &request.category {
        Some(category) => product.category.as_ref() == Some(category),
        None => true,
    };

    let matched: Vec<&ProductSnapshot> = catalog
        .iter()
        .filter(|product| in_category(*product))
        .filter(|product| {
            request.price_ceiling().map_or(true, |max| product.price <= max)
                && preferences.max_price_per_item.map_or(true, |max| product.price <= max)
        })
        .filter(|product| {
            !product.brand.as_deref().is_some_and(|brand| {
                preferences.avoided_brands.iter().any(|avoided| avoided == brand)
            })
        })
        .filter(|product| {
            !product.category.as_deref().is_some_and(|category| {
                preferences.avoided_categories.iter().any(|avoided| avoided == category)
            })
        })
        .filter(|product| {
            let name = normalize(&product.name);
            let lead = first_word(&name);
            name.contains(&query) || (!lead.is_empty() && query.contains(lead))
        })
        .collect();

    if matched.is_empty() && request.category.is_some() {
        return catalog.iter().filter(|product| in_category(*product)).collect();
    }
    matched
}

fn savings(price: f64, request: &ProductRequest) -> (f64, f64) {
    let reference = request.price_ceiling().unwrap_or(price * REFERENCE_PRICE_MARKUP);
    let value = (reference - price).max(0.0);
    let pct = if reference > 0.0 { value / reference * 100.0 } else { 0.0 };
    (round2(value), round2(pct))
}

fn recommendation_type(product: &ProductSnapshot, scores: &RecommendationScores) -> RecommendationType {
    if product.is_on_promotion() {
        RecommendationType::Promotion
    } else if scores.health >= 70 {
        RecommendationType::Healthier
    } else if scores.compatibility >= 80 {
        RecommendationType::BestPrice
    } else {
        RecommendationType::Substitute
    }
}

fn unit_name(unit_id: &UnitId) -> String {
    format!("Unit {}", unit_id.as_str().chars().take(8).collect::<String>())
}

fn justifications(
    product: &ProductSnapshot,
    scores: &RecommendationScores,
    savings_value: f64,
    savings_pct: f64,
) -> Vec<String> {
    let mut lines = Vec::new();

    if savings_value > 0.0 {
        lines.push(format!("Saves R$ {savings_value:.2} ({savings_pct:.1}%)"));
    }
    if scores.cost_benefit >= 80 {
        lines.push("Excellent value for money".to_string());
    }
    if scores.stock >= 80 {
        lines.push(format!("In stock: {} units", product.quantity));
    }
    if scores.health >= 70 {
        lines.push("Healthier option".to_string());
    }
    if let Some(promo_price) = product.promo_price {
        if product.price > 0.0 {
            let discount = (product.price - promo_price) / product.price * 100.0;
            lines.push(format!("On promotion: {discount:.0}% off"));
        }
    }
    if scores.preference >= 70 {
        lines.push("Matches your preferences".to_string());
    }
    if lines.is_empty() {
        lines.push("Product available".to_string());
    }
    lines
}

/// Priority first, then total score when the gap exceeds the tie band, then price
/// (price-focused shoppers) or stock depth.
pub fn compare_recommendations(
    left: &ProductRecommendation,
    right: &ProductRecommendation,
    preferences: &UserPreferences,
) -> Ordering {
    if left.priority != right.priority {
        return left.priority.rank().cmp(&right.priority.rank());
    }
    if left.scores.total.abs_diff(right.scores.total) > SCORE_TIE_BAND {
        return right.scores.total.cmp(&left.scores.total);
    }
    if preferences.prefers_lower_price {
        left.price.total_cmp(&right.price)
    } else {
        right.stock_qty.cmp(&left.stock_qty)
    }
}

/// Stable insertion sort. The tie band makes the comparator non-transitive, which
/// `slice::sort_by` does not accept.
pub fn sort_recommendations(recommendations: &mut [ProductRecommendation], preferences: &UserPreferences) {
    for index in 1..recommendations.len() {
        let mut cursor = index;
        while cursor > 0
            && compare_recommendations(&recommendations[cursor - 1], &recommendations[cursor], preferences)
                == Ordering::Greater
        {
            recommendations.swap(cursor - 1, cursor);
            cursor -= 1;
        }
    }
}

fn summarize(requests: &[ProductRequest], recommendations: &[ProductRecommendation]) -> RecommendationSummary {
    let count = recommendations.len();
    let total_savings: f64 = recommendations.iter().map(|recommendation| recommendation.savings_value).sum();
    let average = |score: fn(&RecommendationScores) -> u8| {
        if count == 0 {
            0
        } else {
            let sum: u32 = recommendations.iter().map(|recommendation| u32::from(score(&recommendation.scores))).sum();
            (f64::from(sum) / count as f64).round() as u32
        }
    };

    RecommendationSummary {
        requested_count: requests.len(),
        recommendation_count: count,
        total_savings: round2(total_savings),
        average_savings: if count == 0 { 0.0 } else { round2(total_savings / count as f64) },
        average_health_score: average(|scores| scores.health),
        average_cost_benefit_score: average(|scores| scores.cost_benefit),
        out_of_stock_count: recommendations.iter().filter(|recommendation| recommendation.stock_qty == 0).count(),
        substitute_count: recommendations
            .iter()
            .filter(|recommendation| recommendation.recommendation_type == RecommendationType::Substitute)
            .count(),
    }
}
