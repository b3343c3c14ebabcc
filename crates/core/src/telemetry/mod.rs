//! Process-local telemetry sinks shared by the engines.

pub mod logs;
pub mod metrics;

pub use logs::{LogBuffer, LogEntry, LogFilter, LogLevel, LogStats};
pub use metrics::{EngineStats, MetricsCollector, PerformanceMetrics};

use crate::config::EngineConfig;

/// Injectable bundle of the log buffer and the metrics collector.
#[derive(Clone, Debug)]
pub struct Telemetry {
    logs: LogBuffer,
    metrics: MetricsCollector,
}

impl Telemetry {
    pub fn new(log_capacity: usize, metrics_window: usize) -> Self {
        Self { logs: LogBuffer::new(log_capacity), metrics: MetricsCollector::new(metrics_window) }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.log_capacity, config.metrics_window)
    }

    /// Buffer-only telemetry, not forwarded to `tracing`.
    pub fn silent() -> Self {
        let telemetry = Self::default();
        telemetry.logs.set_console_output(false);
        telemetry
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
