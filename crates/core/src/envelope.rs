use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution metadata attached to every engine result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineMetadata {
    pub engine_name: String,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Uniform result wrapper returned by every engine entry point.
///
/// `success` is the only failure signal: a failed envelope carries `error` and no
/// `data`, a successful one carries `data` and no `error`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineResult<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: EngineMetadata,
}

impl<T> EngineResult<T> {
    pub fn ok(data: T, metadata: EngineMetadata) -> Self {
        Self { success: true, data: Some(data), error: None, metadata }
    }

    pub fn failed(error: impl Into<String>, metadata: EngineMetadata) -> Self {
        Self { success: false, data: None, error: Some(error.into()), metadata }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Wall-clock stopwatch used by engine wrappers to fill [`EngineMetadata`].
#[derive(Clone, Copy, Debug)]
pub struct ExecutionTimer {
    started: Instant,
}

impl ExecutionTimer {
    pub fn start() -> Self {
        Self { started: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn metadata(&self, engine_name: &str, version: &str) -> EngineMetadata {
        EngineMetadata {
            engine_name: engine_name.to_string(),
            execution_time_ms: self.elapsed_ms(),
            timestamp: Utc::now(),
            version: version.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineResult, ExecutionTimer};

    #[test]
    fn successful_envelope_serializes_without_error_field() {
        let metadata = ExecutionTimer::start().metadata("DemandPredictor", "1.0.0-mock");
        let result = EngineResult::ok(42_u32, metadata);

        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("error").is_none());
        assert_eq!(json["metadata"]["engine_name"], "DemandPredictor");
        assert_eq!(json["metadata"]["version"], "1.0.0-mock");
    }

    #[test]
    fn failed_envelope_carries_error_and_no_data() {
        let metadata = ExecutionTimer::start().metadata("GROOCEngine", "2.0.0-enhanced");
        let result: EngineResult<u32> = EngineResult::failed("catalog unavailable", metadata);

        assert!(!result.is_success());
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("catalog unavailable"));
    }
}
