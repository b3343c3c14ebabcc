use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use precivox_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in effective_values(&config) {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String, &'static [&'static str])> {
    let engines = &config.engines;
    vec![
        ("database.url", config.database.url.clone(), &["PRECIVOX_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["PRECIVOX_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["PRECIVOX_DATABASE_TIMEOUT_SECS"],
        ),
        ("server.bind_address", config.server.bind_address.clone(), &["PRECIVOX_SERVER_BIND_ADDRESS"]),
        ("server.port", config.server.port.to_string(), &["PRECIVOX_SERVER_PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["PRECIVOX_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["PRECIVOX_LOGGING_LEVEL", "PRECIVOX_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["PRECIVOX_LOGGING_FORMAT", "PRECIVOX_LOG_FORMAT"],
        ),
        ("engines.log_capacity", engines.log_capacity.to_string(), &["PRECIVOX_ENGINES_LOG_CAPACITY"]),
        (
            "engines.metrics_window",
            engines.metrics_window.to_string(),
            &["PRECIVOX_ENGINES_METRICS_WINDOW"],
        ),
        (
            "engines.batch_concurrency",
            engines.batch_concurrency.to_string(),
            &["PRECIVOX_ENGINES_BATCH_CONCURRENCY"],
        ),
        (
            "engines.rng_seed",
            engines.rng_seed.map(|seed| seed.to_string()).unwrap_or_else(|| "<entropy>".to_string()),
            &["PRECIVOX_ENGINES_RNG_SEED"],
        ),
        (
            "engines.default_market_id",
            engines.default_market_id.clone(),
            &["PRECIVOX_ENGINES_DEFAULT_MARKET_ID"],
        ),
        ("engines.alert_persist_limit", engines.alert_persist_limit.to_string(), &[]),
        ("engines.alert_ttl_days", engines.alert_ttl_days.to_string(), &[]),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["precivox.toml", "config/precivox.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
