use std::collections::{BTreeMap, HashSet};

use crate::domain::{AlertPriority, AlertType, AlertUrgency, ProductSnapshot, StockAlert};
use crate::random::EngineRng;

use super::types::{
    AbcSplit, CategoryAnalysis, HealthStatus, StockHealthInput, StockHealthReport, StockMetrics,
};
use super::{
    DEFAULT_CATEGORY_TURNOVER, EXCESS_THRESHOLD, LOW_TURNOVER_THRESHOLD, RUPTURE_THRESHOLD,
    UNCATEGORIZED,
};

const CRITICAL_RUPTURE_THRESHOLD: u32 = 5;
const RUPTURE_TARGET_QTY: u32 = 50;
const EXCESS_TARGET_QTY: u32 = 100;
const LOW_TURNOVER_TARGET_QTY: u32 = 80;
const STALE_PRICE_PROBABILITY_CUT: f64 = 0.9;
/// Unit-level monthly turnover until it is derived from sales.
const UNIT_TURNOVER: f64 = 4.2;
const UNIT_COVERAGE_DAYS: f64 = 30.0;

/// Rule-based stock assessment over one unit's snapshot.
#[derive(Clone, Debug)]
pub struct StockHealthAnalyzer {
    rng: EngineRng,
}

impl StockHealthAnalyzer {
    pub fn new(rng: EngineRng) -> Self {
        Self { rng }
    }

    /// `category_turnover` holds monthly turnover per category label; categories
    /// missing from it use the default.
    pub fn analyze(
        &self,
        input: &StockHealthInput,
        stock: &[ProductSnapshot],
        category_turnover: &BTreeMap<String, f64>,
    ) -> StockHealthReport {
        let products: Vec<&ProductSnapshot> =
            stock.iter().filter(|product| matches_categories(input, product)).collect();

        let alerts = self.generate_alerts(&products);
        let category_breakdown = analyze_categories(&products, &alerts, category_turnover);
        let metrics = calculate_metrics(&products, &alerts);
        let score = health_score(&metrics, &alerts);
        let status = HealthStatus::from_score(score);
        let recommendations = recommendations(score, status, &metrics, &alerts);

        StockHealthReport {
            unit_id: input.unit_id.clone(),
            score,
            status,
            alerts,
            metrics,
            recommendations,
            category_breakdown,
        }
    }

    pub fn generate_alerts(&self, products: &[&ProductSnapshot]) -> Vec<StockAlert> {
        let mut alerts = Vec::new();

        for &product in products {
            let quantity = product.quantity;

            if quantity < RUPTURE_THRESHOLD {
                let priority = if quantity < CRITICAL_RUPTURE_THRESHOLD {
                    AlertPriority::Critical
                } else {
                    AlertPriority::High
                };
                let (action, urgency) = match priority {
                    AlertPriority::Critical => (
                        "Restock IMMEDIATELY: rupture expected within 24 hours",
                        AlertUrgency::Immediate,
                    ),
                    _ => ("Schedule an urgent restock within the next 2-3 days", AlertUrgency::ShortTerm),
                };
                alerts.push(alert(
                    product,
                    AlertType::Rupture,
                    priority,
                    format!("Critical stock: only {quantity} units available"),
                    RUPTURE_TARGET_QTY,
                    Some((quantity / 2).max(1)),
                    Some(product.price * f64::from(RUPTURE_TARGET_QTY)),
                    action,
                    urgency,
                ));
            }

            if quantity > EXCESS_THRESHOLD {
                alerts.push(alert(
                    product,
                    AlertType::Excess,
                    AlertPriority::Medium,
                    format!("Excess stock: {quantity} units (estimated turnover: low)"),
                    EXCESS_TARGET_QTY,
                    None,
                    Some(product.price * f64::from(quantity - EXCESS_TARGET_QTY)),
                    "Consider a promotion to speed up turnover and free up capital",
                    AlertUrgency::MediumTerm,
                ));
            }

            if quantity > LOW_TURNOVER_THRESHOLD && quantity <= EXCESS_THRESHOLD {
                alerts.push(alert(
                    product,
                    AlertType::LowTurnover,
                    AlertPriority::Low,
                    format!("Turnover below target: {quantity} units in stock"),
                    LOW_TURNOVER_TARGET_QTY,
                    None,
                    None,
                    "Monitor sales and consider adjusting future orders",
                    AlertUrgency::MediumTerm,
                ));
            }

            if !product.is_on_promotion() && self.rng.unit() > STALE_PRICE_PROBABILITY_CUT {
                alerts.push(alert(
                    product,
                    AlertType::StalePrice,
                    AlertPriority::Low,
                    "No promotion for more than 60 days".to_string(),
                    quantity,
                    None,
                    None,
                    "Review pricing and consider a seasonal promotion",
                    AlertUrgency::MediumTerm,
                ));
            }
        }

        alerts.sort_by_key(|alert| alert.priority.rank());
        alerts
    }
}

pub(crate) fn matches_categories(input: &StockHealthInput, product: &ProductSnapshot) -> bool {
    input.categories.is_empty()
        || product.category.as_ref().is_some_and(|category| input.categories.contains(category))
}

pub(crate) fn category_label(product: &ProductSnapshot) -> &str {
    product.category.as_deref().unwrap_or(UNCATEGORIZED)
}

#[allow(clippy::too_many_arguments)]
fn alert(
    product: &ProductSnapshot,
    alert_type: AlertType,
    priority: AlertPriority,
    description: String,
    recommended_qty: u32,
    days_to_rupture: Option<u32>,
    impact_value: Option<f64>,
    recommended_action: &str,
    urgency: AlertUrgency,
) -> StockAlert {
    StockAlert {
        alert_type,
        priority,
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        category: product.category.clone(),
        description,
        current_qty: product.quantity,
        recommended_qty,
        days_to_rupture,
        impact_value,
        recommended_action: recommended_action.to_string(),
        urgency,
    }
}

fn calculate_metrics(products: &[&ProductSnapshot], alerts: &[StockAlert]) -> StockMetrics {
    let total_products = products.len();
    let at_risk_count = count_type(alerts, |kind| kind == AlertType::Rupture);
    let stalled_count =
        count_type(alerts, |kind| matches!(kind, AlertType::Excess | AlertType::LowTurnover));
    let alerted: HashSet<&str> = alerts.iter().map(|alert| alert.product_id.as_str()).collect();

    StockMetrics {
        total_products,
        total_quantity: products.iter().map(|product| u64::from(product.quantity)).sum(),
        turnover: UNIT_TURNOVER,
        rupture_rate: percentage(at_risk_count, total_products),
        inventory_value: products.iter().map(|product| product.inventory_value()).sum(),
        coverage_days: UNIT_COVERAGE_DAYS,
        active_count: total_products,
        at_risk_count,
        stalled_count,
        optimal_count: total_products.saturating_sub(alerted.len()),
        abc_split: AbcSplit::by_rank(total_products),
    }
}

fn analyze_categories(
    products: &[&ProductSnapshot],
    alerts: &[StockAlert],
    category_turnover: &BTreeMap<String, f64>,
) -> Vec<CategoryAnalysis> {
    let mut groups: BTreeMap<&str, Vec<&ProductSnapshot>> = BTreeMap::new();
    for &product in products {
        groups.entry(category_label(product)).or_default().push(product);
    }

    let mut analyses: Vec<CategoryAnalysis> = groups
        .into_iter()
        .map(|(category, members)| {
            let alerted: HashSet<&str> = alerts
                .iter()
                .filter(|alert| alert.category.as_deref().unwrap_or(UNCATEGORIZED) == category)
                .map(|alert| alert.product_id.as_str())
                .collect();
            let ratio = alerted.len() as f64 / members.len() as f64;

            CategoryAnalysis {
                category: category.to_string(),
                product_count: members.len(),
                inventory_value: members.iter().map(|product| product.inventory_value()).sum(),
                turnover: category_turnover
                    .get(category)
                    .copied()
                    .unwrap_or(DEFAULT_CATEGORY_TURNOVER),
                status: HealthStatus::from_alert_ratio(ratio),
                alerted_products: alerted.len(),
            }
        })
        .collect();

    analyses.sort_by(|left, right| right.inventory_value.total_cmp(&left.inventory_value));
    analyses
}

fn health_score(metrics: &StockMetrics, alerts: &[StockAlert]) -> f64 {
    let critical = alerts.iter().filter(|alert| alert.priority == AlertPriority::Critical).count();
    let high = alerts.iter().filter(|alert| alert.priority == AlertPriority::High).count();

    let mut score = 100.0;
    score -= metrics.rupture_rate * 2.0;
    score -= percentage(metrics.stalled_count, metrics.active_count) * 1.5;
    score -= 5.0 * critical as f64;
    score -= 3.0 * high as f64;
    score += percentage(metrics.optimal_count, metrics.active_count) * 0.2;

    score.clamp(0.0, 100.0)
}

fn recommendations(
    score: f64,
    status: HealthStatus,
    metrics: &StockMetrics,
    alerts: &[StockAlert],
) -> Vec<String> {
    let mut lines = vec![format!("Stock health score: {score:.1}/100 ({})", status.as_str())];

    if status == HealthStatus::Critical {
        lines.push("Attention: stock is in critical condition and needs immediate action".to_string());
    }
    if metrics.at_risk_count > 0 {
        lines.push(format!(
            "{} products at risk of rupture: prioritise restocking",
            metrics.at_risk_count
        ));
    }
    if metrics.stalled_count > 0 {
        lines.push(format!(
            "{} products with low turnover: consider promotions",
            metrics.stalled_count
        ));
    }
    if metrics.rupture_rate > 10.0 {
        lines.push(format!(
            "High rupture rate ({:.1}%): review the restocking process",
            metrics.rupture_rate
        ));
    }
    if metrics.turnover < 3.0 {
        lines.push(format!(
            "Average turnover below target ({:.1}x/month): optimise the product mix",
            metrics.turnover
        ));
    }

    let critical = alerts.iter().filter(|alert| alert.priority == AlertPriority::Critical).count();
    if critical > 0 {
        lines.push(format!("{critical} critical alerts require immediate action"));
    }
    if status == HealthStatus::Optimal {
        lines.push("Stock in excellent condition: keep current practices".to_string());
    }

    lines
}

fn count_type(alerts: &[StockAlert], predicate: impl Fn(AlertType) -> bool) -> usize {
    alerts.iter().filter(|alert| predicate(alert.alert_type)).count()
}

/// `part / whole * 100`, zero when there is nothing to divide by.
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::StockHealthAnalyzer;
    use crate::domain::{AlertPriority, AlertType, AlertUrgency, ProductSnapshot};
    use crate::random::EngineRng;
    use crate::stock_health::{HealthStatus, StockHealthInput};
    use crate::testing::product;

    fn analyzer() -> StockHealthAnalyzer {
        // 0.5 never crosses the stale price cut
        StockHealthAnalyzer::new(EngineRng::fixed(0.5))
    }

    fn input() -> StockHealthInput {
        StockHealthInput::new("unit-1", "market-1")
    }

    fn catalog() -> Vec<ProductSnapshot> {
        vec![
            product("p-ok-1", "Arroz", Some("Mercearia"), 20.0, 60),
            product("p-low", "Feijao", Some("Mercearia"), 8.0, 3),
            product("p-excess", "Refrigerante", Some("Bebidas"), 10.0, 250),
            product("p-slow", "Suco", Some("Bebidas"), 6.0, 180),
            product("p-ok-2", "Sabao", None, 4.0, 40),
        ]
    }

    #[test]
    fn low_quantity_raises_critical_rupture() {
        let stock = vec![product("p-1", "Leite", Some("Laticinios"), 5.0, 3)];
        let report = analyzer().analyze(&input(), &stock, &BTreeMap::new());

        let rupture = report
            .alerts
            .iter()
            .find(|alert| alert.alert_type == AlertType::Rupture)
            .expect("rupture alert");
        assert_eq!(rupture.priority, AlertPriority::Critical);
        assert_eq!(rupture.days_to_rupture, Some(1));
        assert_eq!(rupture.urgency, AlertUrgency::Immediate);
        assert_eq!(rupture.impact_value, Some(250.0));
    }

    #[test]
    fn rupture_between_five_and_ten_is_high_priority() {
        let stock = vec![product("p-1", "Leite", None, 5.0, 8)];
        let report = analyzer().analyze(&input(), &stock, &BTreeMap::new());

        assert_eq!(report.alerts[0].priority, AlertPriority::High);
        assert_eq!(report.alerts[0].days_to_rupture, Some(4));
        assert_eq!(report.alerts[0].urgency, AlertUrgency::ShortTerm);
    }

    #[test]
    fn large_quantity_raises_excess_with_impact() {
        let stock = vec![product("p-1", "Refrigerante", Some("Bebidas"), 10.0, 250)];
        let report = analyzer().analyze(&input(), &stock, &BTreeMap::new());

        assert_eq!(report.alerts.len(), 1);
        let excess = &report.alerts[0];
        assert_eq!(excess.alert_type, AlertType::Excess);
        assert_eq!(excess.priority, AlertPriority::Medium);
        assert_eq!(excess.impact_value, Some(1500.0));
        assert_eq!(excess.recommended_qty, 100);
    }

    #[test]
    fn alerts_are_sorted_by_priority_and_metrics_follow() {
        let report = analyzer().analyze(&input(), &catalog(), &BTreeMap::new());

        let priorities: Vec<AlertPriority> = report.alerts.iter().map(|alert| alert.priority).collect();
        assert_eq!(
            priorities,
            vec![AlertPriority::Critical, AlertPriority::Medium, AlertPriority::Low]
        );

        let metrics = &report.metrics;
        assert_eq!(metrics.total_products, 5);
        assert_eq!(metrics.at_risk_count, 1);
        assert_eq!(metrics.stalled_count, 2);
        assert_eq!(metrics.optimal_count, 2);
        assert_eq!(metrics.rupture_rate, 20.0);
        assert_eq!(metrics.inventory_value, 1200.0 + 24.0 + 2500.0 + 1080.0 + 160.0);
        assert_eq!((metrics.abc_split.a, metrics.abc_split.b, metrics.abc_split.c), (1, 1, 3));
        assert_eq!(metrics.turnover, 4.2);
        assert_eq!(metrics.coverage_days, 30.0);

        // 100 - 40 - 60 - 5 + 8
        assert!((report.score - 3.0).abs() < 1e-9);
        assert_eq!(report.status, HealthStatus::Critical);
        assert!(report.recommendations[0].starts_with("Stock health score: 3.0/100 (CRITICAL)"));
    }

    #[test]
    fn category_breakdown_rolls_up_and_sorts_by_value() {
        let mut turnover = BTreeMap::new();
        turnover.insert("Bebidas".to_string(), 1.5);
        let report = analyzer().analyze(&input(), &catalog(), &turnover);

        let names: Vec<&str> =
            report.category_breakdown.iter().map(|category| category.category.as_str()).collect();
        assert_eq!(names, vec!["Bebidas", "Mercearia", "Uncategorized"]);

        let drinks = &report.category_breakdown[0];
        assert_eq!(drinks.alerted_products, 2);
        assert_eq!(drinks.status, HealthStatus::Critical);
        assert_eq!(drinks.turnover, 1.5);

        let uncategorized = &report.category_breakdown[2];
        assert_eq!(uncategorized.status, HealthStatus::Optimal);
        assert_eq!(uncategorized.turnover, 4.0);
        assert_eq!(report.metrics.turnover, 4.2);
    }

    #[test]
    fn slow_categories_do_not_lower_unit_turnover() {
        let mut turnover = BTreeMap::new();
        turnover.insert("Mercearia".to_string(), 2.0);
        turnover.insert("Bebidas".to_string(), 2.0);
        let report = analyzer().analyze(&input(), &catalog(), &turnover);

        assert_eq!(report.metrics.turnover, 4.2);
        assert_eq!(report.metrics.coverage_days, 30.0);
        assert!(!report.recommendations.iter().any(|line| line.contains("turnover below target")));
    }

    #[test]
    fn category_filter_limits_analysis() {
        let filtered = input().with_categories(vec!["Mercearia".to_string()]);
        let report = analyzer().analyze(&filtered, &catalog(), &BTreeMap::new());

        assert_eq!(report.metrics.total_products, 2);
        assert_eq!(report.category_breakdown.len(), 1);
        assert!(report.alerts.iter().all(|alert| alert.category.as_deref() == Some("Mercearia")));
    }

    #[test]
    fn healthy_stock_scores_optimal() {
        let stock: Vec<ProductSnapshot> = (0..4)
            .map(|index| product(&format!("p-{index}"), "Arroz", Some("Mercearia"), 10.0, 50))
            .collect();
        let report = analyzer().analyze(&input(), &stock, &BTreeMap::new());

        assert!(report.alerts.is_empty());
        assert_eq!(report.score, 100.0);
        assert_eq!(report.status, HealthStatus::Optimal);
        assert!(report
            .recommendations
            .iter()
            .any(|line| line == "Stock in excellent condition: keep current practices"));
    }

    #[test]
    fn empty_stock_does_not_divide_by_zero() {
        let report = analyzer().analyze(&input(), &[], &BTreeMap::new());

        assert_eq!(report.metrics.rupture_rate, 0.0);
        assert_eq!(report.metrics.turnover, 4.2);
        assert_eq!(report.metrics.coverage_days, 30.0);
        assert!((0.0..=100.0).contains(&report.score));
        assert_eq!(report.status, HealthStatus::from_score(report.score));
    }

    #[test]
    fn stale_price_needs_a_high_draw_and_no_promotion() {
        let mut promoted = product("p-promo", "Cafe", Some("Mercearia"), 12.0, 50);
        promoted.promo_price = Some(10.0);
        let stock = vec![product("p-regular", "Cha", Some("Mercearia"), 8.0, 50), promoted];

        let report = StockHealthAnalyzer::new(EngineRng::fixed(0.95))
            .analyze(&input(), &stock, &BTreeMap::new());

        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].alert_type, AlertType::StalePrice);
        assert_eq!(report.alerts[0].product_id.as_str(), "p-regular");
        assert_eq!(report.alerts[0].recommended_qty, 50);
    }

    #[test]
    fn seeded_runs_are_idempotent_and_status_tracks_score() {
        for seed in [1_u64, 7, 42] {
            let first = StockHealthAnalyzer::new(EngineRng::seeded(seed))
                .analyze(&input(), &catalog(), &BTreeMap::new());
            let second = StockHealthAnalyzer::new(EngineRng::seeded(seed))
                .analyze(&input(), &catalog(), &BTreeMap::new());

            assert_eq!(first.alerts, second.alerts);
            assert_eq!(first.score, second.score);
            assert_eq!(first.status, second.status);
            assert!((0.0..=100.0).contains(&first.score));
            assert_eq!(first.status, HealthStatus::from_score(first.score));
        }
    }
}
