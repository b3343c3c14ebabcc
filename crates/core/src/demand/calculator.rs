use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::demand::types::{
    ConfidenceInterval, DailyForecast, DemandForecast, DemandInput, DemandMetrics, Seasonality,
};
use crate::domain::{SalesRecord, Trend};
use crate::random::EngineRng;
use crate::services::mean;

const RECENT_WINDOW_DAYS: usize = 7;
const PERTURBATION: f64 = 0.1;
const Z_95: f64 = 1.96;
const SAFETY_MARGIN: f64 = 1.2;

/// Moving-average forecaster over a zero-filled daily sales history.
#[derive(Clone, Debug)]
pub struct DemandCalculator {
    rng: EngineRng,
}

impl DemandCalculator {
    pub fn new(rng: EngineRng) -> Self {
        Self { rng }
    }

    pub fn calculate(
        &self,
        input: &DemandInput,
        history: &[SalesRecord],
        today: NaiveDate,
    ) -> DemandForecast {
        let window = RECENT_WINDOW_DAYS.min(history.len());
        let recent = &history[history.len() - window..];
        let (mean_daily, std_dev) = mean_and_std(recent.iter().map(|record| record.quantity));
        let coefficient_of_variation = (mean_daily > 0.0).then(|| std_dev / mean_daily);

        let weekly_pattern = weekly_pattern(history);
        let daily_forecasts = self.forecast_series(
            today,
            input.forecast_horizon_days,
            mean_daily,
            std_dev,
            &weekly_pattern,
        );
        let trend = forecast_trend(&daily_forecasts);
        let seasonality = Seasonality {
            score: seasonality_score(history),
            peaks: Vec::new(),
            troughs: Vec::new(),
            weekly_pattern,
        };
        let confidence = confidence(history.len(), coefficient_of_variation);
        let recommendations =
            recommendations(mean_daily, trend, seasonality.score, confidence);

        DemandForecast {
            product_id: input.product_id.clone(),
            unit_id: input.unit_id.clone(),
            metrics: DemandMetrics {
                mean_daily,
                std_dev,
                coefficient_of_variation: coefficient_of_variation.unwrap_or(0.0),
                total_forecast: daily_forecasts.iter().map(|day| day.expected_qty).sum(),
            },
            daily_forecasts,
            confidence,
            trend,
            seasonality,
            recommendations,
        }
    }

    fn forecast_series(
        &self,
        today: NaiveDate,
        horizon: u32,
        mean_daily: f64,
        std_dev: f64,
        weekly_pattern: &BTreeMap<u32, f64>,
    ) -> Vec<DailyForecast> {
        let spread = std_dev * Z_95;

        (1..=i64::from(horizon))
            .map(|offset| {
                let date = today + Duration::days(offset);
                let multiplier = weekly_pattern
                    .get(&date.weekday().num_days_from_sunday())
                    .copied()
                    .unwrap_or(1.0);
                let variation = 1.0 + self.rng.uniform(-PERTURBATION, PERTURBATION);
                let expected = (mean_daily * multiplier * variation).round().max(0.0);

                DailyForecast {
                    date,
                    expected_qty: expected as u32,
                    confidence_interval: ConfidenceInterval {
                        min: (expected - spread).round().max(0.0) as u32,
                        max: (expected + spread).round().max(0.0) as u32,
                    },
                }
            })
            .collect()
    }
}

fn mean_and_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let average = mean(values.clone());
    let variance = mean(values.map(|value| (value - average).powi(2)));
    (average, variance.sqrt())
}

/// Per-weekday average normalised by the mean of the weekday averages.
pub(crate) fn weekly_pattern(history: &[SalesRecord]) -> BTreeMap<u32, f64> {
    let mut totals: BTreeMap<u32, (f64, u32)> = BTreeMap::new();
    for record in history {
        let entry = totals.entry(record.date.weekday().num_days_from_sunday()).or_default();
        entry.0 += record.quantity;
        entry.1 += 1;
    }

    let averages: BTreeMap<u32, f64> =
        totals.into_iter().map(|(day, (sum, count))| (day, sum / f64::from(count))).collect();
    let overall = mean(averages.values().copied());
    if overall <= 0.0 {
        return BTreeMap::new();
    }

    averages.into_iter().map(|(day, average)| (day, average / overall)).collect()
}

pub(crate) fn forecast_trend(series: &[DailyForecast]) -> Trend {
    if series.len() < 4 {
        return Trend::Stable;
    }

    let mid = series.len() / 2;
    let first = mean(series[..mid].iter().map(|day| f64::from(day.expected_qty)));
    let second = mean(series[mid..].iter().map(|day| f64::from(day.expected_qty)));

    if second > first * 1.1 {
        Trend::Rising
    } else if second < first * 0.9 {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

pub(crate) fn seasonality_score(history: &[SalesRecord]) -> f64 {
    let (average, std_dev) = mean_and_std(history.iter().map(|record| record.quantity));
    if average <= 0.0 {
        return 0.0;
    }
    (std_dev.powi(2) / average.powi(2)).min(1.0)
}

pub(crate) fn confidence(data_points: usize, coefficient_of_variation: Option<f64>) -> f64 {
    let mut confidence = 0.5;

    confidence += match data_points {
        n if n >= 30 => 0.3,
        n if n >= 14 => 0.2,
        n if n >= 7 => 0.1,
        _ => 0.0,
    };

    if let Some(cv) = coefficient_of_variation {
        if cv < 0.3 {
            confidence += 0.2;
        } else if cv < 0.5 {
            confidence += 0.1;
        }
    }

    f64::min(1.0, confidence)
}

fn recommendations(mean_daily: f64, trend: Trend, seasonality: f64, confidence: f64) -> Vec<String> {
    let mut lines = vec![
        format!("Expected average demand: {mean_daily:.1} units/day"),
        format!("Identified trend: {}", trend.as_str()),
    ];

    if confidence > 0.7 {
        lines.push(format!("High confidence in this forecast ({:.0}%)", confidence * 100.0));
    } else if confidence < 0.5 {
        lines.push("Low confidence: collect more sales history before relying on it".to_string());
    }

    let weekly_stock = (mean_daily * 7.0 * SAFETY_MARGIN).ceil();
    lines.push(format!("Recommended stock for the next 7 days: {weekly_stock:.0} units"));

    match trend {
        Trend::Rising => {
            lines.push("Demand is growing: consider raising orders by 15-20%".to_string())
        }
        Trend::Falling => {
            lines.push("Demand is falling: trim orders to avoid excess stock".to_string())
        }
        Trend::Stable => {}
    }

    if seasonality > 0.6 {
        lines.push("Highly seasonal product: plan stock ahead of demand peaks".to_string());
    }

    lines
}
