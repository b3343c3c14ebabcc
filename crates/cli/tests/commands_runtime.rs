use std::env;
use std::sync::{Mutex, OnceLock};

use precivox_cli::commands::forecast::{self, ForecastArgs};
use precivox_cli::commands::price::{self, PriceArgs};
use precivox_cli::commands::recommend::{self, RecommendSource};
use precivox_cli::commands::stock_health::{self, StockHealthArgs};
use precivox_cli::commands::{doctor, migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_memory_database() {
    with_env(&[("PRECIVOX_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_engine_settings() {
    with_env(
        &[
            ("PRECIVOX_DATABASE_URL", "sqlite::memory:"),
            ("PRECIVOX_ENGINES_BATCH_CONCURRENCY", "0"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = sqlite_url(&dir);
    with_env(&[("PRECIVOX_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);

        assert_eq!(first_payload["message"], second_payload["message"]);
        let message = first_payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("market-default"));
    });
}

#[test]
fn engine_commands_run_against_seeded_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = sqlite_url(&dir);
    with_env(&[("PRECIVOX_DATABASE_URL", url.as_str()), ("PRECIVOX_ENGINES_RNG_SEED", "11")], || {
        assert_eq!(seed::run().exit_code, 0, "seed should succeed");

        let forecast = forecast::run(ForecastArgs {
            product_id: "prod-arroz-5kg".to_string(),
            unit_id: "unit-centro".to_string(),
            horizon_days: 14,
            history_days: 30,
        });
        assert_eq!(forecast.exit_code, 0, "forecast output: {}", forecast.output);
        let envelope = parse_payload(&forecast.output);
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["metadata"]["engine_name"], "DemandPredictor");
        assert_eq!(envelope["data"]["daily_forecasts"].as_array().map(Vec::len), Some(14));

        let health = stock_health::run(StockHealthArgs {
            unit_id: "unit-centro".to_string(),
            market_id: None,
            categories: Vec::new(),
        });
        assert_eq!(health.exit_code, 0, "stock health output: {}", health.output);
        let envelope = parse_payload(&health.output);
        let alerts = envelope["data"]["alerts"].as_array().cloned().unwrap_or_default();
        assert!(alerts.iter().any(|alert| alert["product_id"] == "prod-leite-1l"));

        let recommend = recommend::run(RecommendSource::Inline(
            r#"{"products":[{"name":"Arroz","quantity":2}]}"#.to_string(),
        ));
        assert_eq!(recommend.exit_code, 0, "recommend output: {}", recommend.output);
        let envelope = parse_payload(&recommend.output);
        assert_eq!(envelope["metadata"]["engine_name"], "GROOCEngine");
        let recommendations =
            envelope["data"]["recommendations"].as_array().cloned().unwrap_or_default();
        assert!(!recommendations.is_empty());
    });
}

#[test]
fn recommend_on_empty_catalog_returns_failed_envelope() {
    with_env(&[("PRECIVOX_DATABASE_URL", "sqlite::memory:")], || {
        let result = recommend::run(RecommendSource::Inline(
            r#"{"products":[{"name":"Arroz"}]}"#.to_string(),
        ));
        assert_eq!(result.exit_code, 1);

        let envelope = parse_payload(&result.output);
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"], "No products available at the moment");
    });
}

#[test]
fn recommend_rejects_malformed_input_before_touching_storage() {
    with_env(&[("PRECIVOX_DATABASE_URL", "sqlite::memory:")], || {
        let result = recommend::run(RecommendSource::Inline("not json".to_string()));
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn price_prints_envelope_without_database() {
    with_env(&[("PRECIVOX_ENGINES_RNG_SEED", "5")], || {
        let result = price::run(PriceArgs {
            product_id: "prod-cafe-500g".to_string(),
            current_price: 17.9,
            unit_id: None,
            cost: Some(9.0),
        });
        assert_eq!(result.exit_code, 0, "price output: {}", result.output);

        let envelope = parse_payload(&result.output);
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["metadata"]["version"], "1.0.0-mock");
        assert_eq!(envelope["data"]["product_id"], "prod-cafe-500g");
    });
}

#[test]
fn price_with_non_positive_price_exits_with_failed_envelope() {
    with_env(&[], || {
        let result = price::run(PriceArgs {
            product_id: "prod-cafe-500g".to_string(),
            current_price: 0.0,
            unit_id: None,
            cost: None,
        });
        assert_eq!(result.exit_code, 1);

        let envelope = parse_payload(&result.output);
        assert_eq!(envelope["success"], false);
        assert!(envelope.get("data").is_none());
    });
}

#[test]
fn doctor_reports_pass_with_memory_database() {
    with_env(&[("PRECIVOX_DATABASE_URL", "sqlite::memory:")], || {
        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "pass");
        let checks = report["checks"].as_array().cloned().unwrap_or_default();
        assert_eq!(checks.len(), 3);
    });
}

fn sqlite_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}", dir.path().join("precivox.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poison| poison.into_inner());

    let keys = [
        "PRECIVOX_DATABASE_URL",
        "PRECIVOX_DATABASE_MAX_CONNECTIONS",
        "PRECIVOX_DATABASE_TIMEOUT_SECS",
        "PRECIVOX_SERVER_BIND_ADDRESS",
        "PRECIVOX_SERVER_PORT",
        "PRECIVOX_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "PRECIVOX_LOGGING_LEVEL",
        "PRECIVOX_LOGGING_FORMAT",
        "PRECIVOX_LOG_LEVEL",
        "PRECIVOX_LOG_FORMAT",
        "PRECIVOX_ENGINES_LOG_CAPACITY",
        "PRECIVOX_ENGINES_METRICS_WINDOW",
        "PRECIVOX_ENGINES_BATCH_CONCURRENCY",
        "PRECIVOX_ENGINES_RNG_SEED",
        "PRECIVOX_ENGINES_DEFAULT_MARKET_ID",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
