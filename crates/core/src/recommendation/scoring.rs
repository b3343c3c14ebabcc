//! Multi-criteria scoring for recommendation candidates

use crate::domain::ProductSnapshot;

use super::types::{ProductRequest, RecommendationScores, UserHistory, UserPreferences};

/// Blend weights for the five sub-scores. They sum to 1.0 only for the default
/// preference set; price and health focus shift weight onto their criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub cost_benefit: f64,
    pub compatibility: f64,
    pub stock: f64,
    pub health: f64,
    pub preference: f64,
}

impl ScoringWeights {
    pub fn for_preferences(preferences: &UserPreferences) -> Self {
        Self {
            cost_benefit: if preferences.prefers_lower_price { 0.35 } else { 0.25 },
            compatibility: 0.25,
            stock: 0.15,
            health: if preferences.wants_healthy { 0.15 } else { 0.05 },
            preference: 0.20,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::for_preferences(&UserPreferences::default())
    }
}

struct Keyword {
    terms: &'static [&'static str],
    delta: f64,
}

const HEALTH_KEYWORDS: &[Keyword] = &[
    Keyword { terms: &["integral", "whole"], delta: 15.0 },
    Keyword { terms: &["light"], delta: 10.0 },
    Keyword { terms: &["zero"], delta: 10.0 },
    Keyword { terms: &["orgânico", "organico", "organic"], delta: 20.0 },
    Keyword { terms: &["natural"], delta: 10.0 },
    Keyword { terms: &["sem açúcar", "sem acucar", "sugar-free", "sugar free"], delta: 15.0 },
    Keyword { terms: &["frito", "fried"], delta: -15.0 },
    Keyword { terms: &["refrigerante", "soda"], delta: -10.0 },
    Keyword { terms: &["doce", "sweet"], delta: -5.0 },
];

pub(crate) fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub(crate) fn first_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

pub(crate) fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| haystack.contains(term))
}

/// Scores one candidate against one request.
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    weights: ScoringWeights,
}

impl ScoreCalculator {
    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    pub fn score(
        &self,
        product: &ProductSnapshot,
        request: &ProductRequest,
        preferences: &UserPreferences,
        history: Option<&UserHistory>,
    ) -> RecommendationScores {
        let cost_benefit = cost_benefit_score(product, request);
        let compatibility = compatibility_score(product, request);
        let stock = stock_score(product.quantity, request.quantity);
        let health = health_score(&product.name);
        let preference = preference_score(product, preferences, history);

        let total = cost_benefit * self.weights.cost_benefit
            + compatibility * self.weights.compatibility
            + stock * self.weights.stock
            + health * self.weights.health
            + preference * self.weights.preference;

        RecommendationScores {
            cost_benefit: to_score(cost_benefit),
            compatibility: to_score(compatibility),
            stock: to_score(stock),
            health: to_score(health),
            preference: to_score(preference),
            total: to_score(total),
        }
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::with_weights(ScoringWeights::default())
    }
}

pub fn cost_benefit_score(product: &ProductSnapshot, request: &ProductRequest) -> f64 {
    let mut score = match request.price_ceiling() {
        Some(max_price) => (100.0 - product.price / max_price * 100.0).max(0.0),
        None => 50.0,
    };
    if product.is_on_promotion() {
        score += 20.0;
    }
    if product.has_brand() {
        score += 10.0;
    }
    score.min(100.0)
}

pub fn compatibility_score(product: &ProductSnapshot, request: &ProductRequest) -> f64 {
    let query = normalize(&request.name);
    let name = normalize(&product.name);

    if name == query {
        100.0
    } else if name.contains(&query) {
        80.0
    } else if name.contains(first_word(&query)) {
        60.0
    } else if product.category == request.category {
        40.0
    } else {
        20.0
    }
}

pub fn stock_score(available: u32, requested: u32) -> f64 {
    let requested = requested.max(1);
    if available == 0 {
        0.0
    } else if available >= requested.saturating_mul(2) {
        100.0
    } else if available >= requested {
        80.0
    } else {
        f64::from(available) / f64::from(requested) * 60.0
    }
}

/// Keyword heuristic over the product name.
pub fn health_score(product_name: &str) -> f64 {
    let name = normalize(product_name);
    let score = HEALTH_KEYWORDS
        .iter()
        .filter(|keyword| contains_any(&name, keyword.terms))
        .fold(50.0, |score, keyword| score + keyword.delta);
    score.clamp(0.0, 100.0)
}

pub fn preference_score(
    product: &ProductSnapshot,
    preferences: &UserPreferences,
    history: Option<&UserHistory>,
) -> f64 {
    let brand_in = |list: &[String]| {
        product.brand.as_deref().is_some_and(|brand| list.iter().any(|item| item == brand))
    };
    let mut score: f64 = 50.0;

    if brand_in(&preferences.preferred_brands) {
        score += 30.0;
    }
    if let Some(history) = history {
        if brand_in(&history.frequent_brands) {
            score += 20.0;
        }
        let frequent_category = product.category.as_deref().is_some_and(|category| {
            history.frequent_categories.iter().any(|frequent| frequent == category)
        });
        if frequent_category {
            score += 15.0;
        }
        if product.price <= history.average_spend * 1.1 {
            score += 10.0;
        }
    }
    score.min(100.0)
}

fn to_score(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::product;

    fn request(name: &str) -> ProductRequest {
        ProductRequest::new(name, 1)
    }

    #[test]
    fn weights_follow_preferences() {
        let defaults = ScoringWeights::default();
        assert_eq!(defaults.cost_benefit, 0.35);
        assert_eq!(defaults.health, 0.05);

        let healthy = ScoringWeights::for_preferences(&UserPreferences {
            prefers_lower_price: false,
            wants_healthy: true,
            ..UserPreferences::default()
        });
        assert_eq!(healthy.cost_benefit, 0.25);
        assert_eq!(healthy.health, 0.15);
        assert_eq!(healthy.compatibility, 0.25);
        assert_eq!(healthy.stock, 0.15);
        assert_eq!(healthy.preference, 0.20);
    }

    #[test]
    fn exact_match_with_deep_stock_scores_full_marks() {
        let arroz = product("p-1", "Arroz", Some("Mercearia"), 20.0, 100);
        let scores = ScoreCalculator::default().score(
            &arroz,
            &request("Arroz"),
            &UserPreferences::default(),
            None,
        );

        assert_eq!(scores.stock, 100);
        assert_eq!(scores.compatibility, 100);
        assert_eq!(scores.cost_benefit, 50);
        assert_eq!(scores.health, 50);
        assert_eq!(scores.preference, 50);
        // 50*.35 + 100*.25 + 100*.15 + 50*.05 + 50*.2
        assert_eq!(scores.total, 70);
    }

    #[test]
    fn compatibility_bands() {
        let candidate = |name: &str| product("p", name, Some("Mercearia"), 5.0, 10);
        let arroz = request("Arroz Integral");

        assert_eq!(compatibility_score(&candidate("arroz integral"), &arroz), 100.0);
        assert_eq!(compatibility_score(&candidate("Arroz Integral Tio"), &arroz), 80.0);
        assert_eq!(compatibility_score(&candidate("Arroz Branco"), &arroz), 60.0);
        assert_eq!(
            compatibility_score(&candidate("Feijao"), &arroz.clone().with_category("Mercearia")),
            40.0
        );
        assert_eq!(compatibility_score(&candidate("Feijao"), &arroz), 20.0);

        let uncategorized = product("p", "Feijao", None, 5.0, 10);
        assert_eq!(compatibility_score(&uncategorized, &arroz), 40.0);
    }

    #[test]
    fn stock_bands() {
        assert_eq!(stock_score(0, 3), 0.0);
        assert_eq!(stock_score(6, 3), 100.0);
        assert_eq!(stock_score(4, 3), 80.0);
        assert_eq!(stock_score(1, 4), 15.0);
    }

    #[test]
    fn cost_benefit_uses_price_ceiling_promotion_and_brand() {
        let mut branded = product("p", "Cafe", None, 8.0, 10);
        branded.brand = Some("Pilao".to_string());
        let capped = request("Cafe").with_max_price(10.0);
        assert!((cost_benefit_score(&branded, &capped) - 30.0).abs() < 1e-9);

        // the promotion adds its bonus but the ratio stays on the regular price
        branded.promo_price = Some(2.0);
        assert!((cost_benefit_score(&branded, &capped) - 50.0).abs() < 1e-9);

        let over_ceiling = product("p", "Cafe", None, 30.0, 10);
        assert_eq!(cost_benefit_score(&over_ceiling, &capped), 0.0);
    }

    #[test]
    fn health_keywords_in_both_languages() {
        assert_eq!(health_score("Arroz"), 50.0);
        assert_eq!(health_score("Granola Integral Orgânico"), 85.0);
        assert_eq!(health_score("Organic whole oats"), 85.0);
        assert_eq!(health_score("Refrigerante Doce"), 35.0);
        assert_eq!(health_score("Salgadinho frito refrigerante doce"), 20.0);
        assert!(health_score("integral light zero organico natural sem acucar") <= 100.0);
    }

    #[test]
    fn preference_rewards_brands_and_history() {
        let mut candidate = product("p", "Leite", Some("Laticinios"), 5.0, 10);
        candidate.brand = Some("Itambe".to_string());
        let preferences = UserPreferences {
            preferred_brands: vec!["Itambe".to_string()],
            ..UserPreferences::default()
        };
        let history = UserHistory {
            frequent_brands: vec!["Itambe".to_string()],
            frequent_categories: vec!["Laticinios".to_string()],
            average_spend: 5.0,
        };

        assert_eq!(preference_score(&candidate, &preferences, None), 80.0);
        assert_eq!(preference_score(&candidate, &preferences, Some(&history)), 100.0);
        assert_eq!(preference_score(&candidate, &UserPreferences::default(), Some(&history)), 95.0);
    }

    #[test]
    fn missing_brand_and_category_never_match_blank_entries() {
        let anonymous = product("p", "Leite", None, 5.0, 10);
        let preferences =
            UserPreferences { preferred_brands: vec![String::new()], ..UserPreferences::default() };
        let history = UserHistory {
            frequent_brands: vec![String::new()],
            frequent_categories: vec![String::new()],
            average_spend: 1.0,
        };

        assert_eq!(preference_score(&anonymous, &preferences, Some(&history)), 50.0);
    }
}
