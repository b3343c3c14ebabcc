use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub execution_time_ms: u64,
    pub items_processed: usize,
    /// 1.0 for a successful execution, 0.0 for a failed one.
    pub success_rate: f64,
    pub recorded_at: DateTime<Utc>,
}

impl PerformanceMetrics {
    pub fn new(execution_time_ms: u64, items_processed: usize, success_rate: f64) -> Self {
        Self { execution_time_ms, items_processed, success_rate, recorded_at: Utc::now() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub engine: String,
    pub total_executions: usize,
    pub avg_execution_time_ms: f64,
    pub min_execution_time_ms: u64,
    pub max_execution_time_ms: u64,
    pub avg_success_rate: f64,
    pub total_items_processed: usize,
}

/// Rolling per-engine window of execution metrics.
#[derive(Clone, Debug)]
pub struct MetricsCollector {
    windows: Arc<Mutex<BTreeMap<String, VecDeque<PerformanceMetrics>>>>,
    window: usize,
}

impl MetricsCollector {
    pub fn new(window: usize) -> Self {
        Self { windows: Arc::new(Mutex::new(BTreeMap::new())), window: window.max(1) }
    }

    pub fn record(&self, engine: &str, metrics: PerformanceMetrics) {
        let window = self.window;
        self.with_windows(|windows| {
            let series = windows.entry(engine.to_string()).or_default();
            if series.len() >= window {
                series.pop_front();
            }
            series.push_back(metrics);
        });
    }

    pub fn stats(&self, engine: &str) -> Option<EngineStats> {
        self.with_windows(|windows| {
            let series = windows.get(engine).filter(|series| !series.is_empty())?;
            let count = series.len();
            let total_time: u64 = series.iter().map(|m| m.execution_time_ms).sum();
            let total_success: f64 = series.iter().map(|m| m.success_rate).sum();

            Some(EngineStats {
                engine: engine.to_string(),
                total_executions: count,
                avg_execution_time_ms: total_time as f64 / count as f64,
                min_execution_time_ms: series
                    .iter()
                    .map(|m| m.execution_time_ms)
                    .min()
                    .unwrap_or_default(),
                max_execution_time_ms: series
                    .iter()
                    .map(|m| m.execution_time_ms)
                    .max()
                    .unwrap_or_default(),
                avg_success_rate: total_success / count as f64,
                total_items_processed: series.iter().map(|m| m.items_processed).sum(),
            })
        })
    }

    pub fn engines(&self) -> Vec<String> {
        self.with_windows(|windows| windows.keys().cloned().collect())
    }

    /// Drops the window of one engine, or of every engine when `engine` is `None`.
    pub fn clear(&self, engine: Option<&str>) {
        self.with_windows(|windows| match engine {
            Some(engine) => {
                windows.remove(engine);
            }
            None => windows.clear(),
        });
    }

    fn with_windows<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, VecDeque<PerformanceMetrics>>) -> R,
    ) -> R {
        match self.windows.lock() {
            Ok(mut windows) => f(&mut windows),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MetricsCollector, PerformanceMetrics};

    #[test]
    fn stats_aggregate_the_rolling_window() {
        let collector = MetricsCollector::new(100);
        collector.record("DemandPredictor", PerformanceMetrics::new(10, 1, 1.0));
        collector.record("DemandPredictor", PerformanceMetrics::new(30, 1, 0.0));

        let stats = collector.stats("DemandPredictor").expect("stats");
        assert_eq!(stats.total_executions, 2);
        assert_eq!(stats.avg_execution_time_ms, 20.0);
        assert_eq!(stats.min_execution_time_ms, 10);
        assert_eq!(stats.max_execution_time_ms, 30);
        assert_eq!(stats.avg_success_rate, 0.5);
        assert_eq!(stats.total_items_processed, 2);
    }

    #[test]
    fn window_keeps_only_most_recent_entries() {
        let collector = MetricsCollector::new(3);
        for time in 1..=5 {
            collector.record("StockHealthEngine", PerformanceMetrics::new(time, 1, 1.0));
        }

        let stats = collector.stats("StockHealthEngine").expect("stats");
        assert_eq!(stats.total_executions, 3);
        assert_eq!(stats.min_execution_time_ms, 3);
    }

    #[test]
    fn unknown_engine_has_no_stats_and_clear_removes_engines() {
        let collector = MetricsCollector::new(10);
        assert!(collector.stats("GROOCEngine").is_none());

        collector.record("GROOCEngine", PerformanceMetrics::new(5, 2, 1.0));
        collector.record("SmartPricingEngine", PerformanceMetrics::new(5, 1, 1.0));
        assert_eq!(collector.engines(), vec!["GROOCEngine", "SmartPricingEngine"]);

        collector.clear(Some("GROOCEngine"));
        assert_eq!(collector.engines(), vec!["SmartPricingEngine"]);
        collector.clear(None);
        assert!(collector.engines().is_empty());
    }
}
