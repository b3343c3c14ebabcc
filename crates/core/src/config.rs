use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub engines: EngineConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Tuning knobs shared by the analytics engines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Entries kept by the in-process log buffer before the oldest is evicted.
    pub log_capacity: usize,
    /// Executions kept per engine by the metrics collector.
    pub metrics_window: usize,
    /// Upper bound on concurrently running single-product predictions in a batch.
    pub batch_concurrency: usize,
    /// Fixed seed for the engines' random source. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    /// Catalog consulted by the recommendation engine when a request names no market.
    pub default_market_id: String,
    pub alert_persist_limit: usize,
    pub alert_ttl_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_capacity: 1000,
            metrics_window: 100,
            batch_concurrency: 8,
            rng_seed: None,
            default_market_id: "market-default".to_string(),
            alert_persist_limit: 20,
            alert_ttl_days: 7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub rng_seed: Option<u64>,
    pub default_market_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://precivox.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            engines: EngineConfig::default(),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("precivox.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(engines) = patch.engines {
            if let Some(log_capacity) = engines.log_capacity {
                self.engines.log_capacity = log_capacity;
            }
            if let Some(metrics_window) = engines.metrics_window {
                self.engines.metrics_window = metrics_window;
            }
            if let Some(batch_concurrency) = engines.batch_concurrency {
                self.engines.batch_concurrency = batch_concurrency;
            }
            if let Some(rng_seed) = engines.rng_seed {
                self.engines.rng_seed = Some(rng_seed);
            }
            if let Some(default_market_id) = engines.default_market_id {
                self.engines.default_market_id = default_market_id;
            }
            if let Some(alert_persist_limit) = engines.alert_persist_limit {
                self.engines.alert_persist_limit = alert_persist_limit;
            }
            if let Some(alert_ttl_days) = engines.alert_ttl_days {
                self.engines.alert_ttl_days = alert_ttl_days;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRECIVOX_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("PRECIVOX_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_value("PRECIVOX_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("PRECIVOX_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_value("PRECIVOX_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PRECIVOX_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PRECIVOX_SERVER_PORT") {
            self.server.port = parse_value("PRECIVOX_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PRECIVOX_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_value("PRECIVOX_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("PRECIVOX_LOGGING_LEVEL").or_else(|| read_env("PRECIVOX_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRECIVOX_LOGGING_FORMAT").or_else(|| read_env("PRECIVOX_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("PRECIVOX_ENGINES_LOG_CAPACITY") {
            self.engines.log_capacity = parse_value("PRECIVOX_ENGINES_LOG_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("PRECIVOX_ENGINES_METRICS_WINDOW") {
            self.engines.metrics_window = parse_value("PRECIVOX_ENGINES_METRICS_WINDOW", &value)?;
        }
        if let Some(value) = read_env("PRECIVOX_ENGINES_BATCH_CONCURRENCY") {
            self.engines.batch_concurrency =
                parse_value("PRECIVOX_ENGINES_BATCH_CONCURRENCY", &value)?;
        }
        if let Some(value) = read_env("PRECIVOX_ENGINES_RNG_SEED") {
            self.engines.rng_seed = Some(parse_value("PRECIVOX_ENGINES_RNG_SEED", &value)?);
        }
        if let Some(value) = read_env("PRECIVOX_ENGINES_DEFAULT_MARKET_ID") {
            self.engines.default_market_id = value;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(rng_seed) = overrides.rng_seed {
            self.engines.rng_seed = Some(rng_seed);
        }
        if let Some(default_market_id) = overrides.default_market_id {
            self.engines.default_market_id = default_market_id;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        validate_engines(&self.engines)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("precivox.toml"), PathBuf::from("config/precivox.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_engines(engines: &EngineConfig) -> Result<(), ConfigError> {
    if engines.log_capacity == 0 {
        return Err(ConfigError::Validation(
            "engines.log_capacity must be greater than zero".to_string(),
        ));
    }
    if engines.metrics_window == 0 {
        return Err(ConfigError::Validation(
            "engines.metrics_window must be greater than zero".to_string(),
        ));
    }
    if engines.batch_concurrency == 0 || engines.batch_concurrency > 256 {
        return Err(ConfigError::Validation(
            "engines.batch_concurrency must be in range 1..=256".to_string(),
        ));
    }
    if engines.default_market_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "engines.default_market_id must not be empty".to_string(),
        ));
    }
    if engines.alert_ttl_days <= 0 {
        return Err(ConfigError::Validation(
            "engines.alert_ttl_days must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    engines: Option<EnginesPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginesPatch {
    log_capacity: Option<usize>,
    metrics_window: Option<usize>,
    batch_concurrency: Option<usize>,
    rng_seed: Option<u64>,
    default_market_id: Option<String>,
    alert_persist_limit: Option<usize>,
    alert_ttl_days: Option<i64>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_without_any_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.engines.log_capacity == 1000, "log buffer should default to 1000 entries")?;
        ensure(config.engines.metrics_window == 100, "metrics window should default to 100")?;
        ensure(config.engines.alert_persist_limit == 20, "alert limit should default to 20")?;
        ensure(config.engines.rng_seed.is_none(), "rng should default to entropy seeding")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PRECIVOX_MARKET", "market-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("precivox.toml");
            fs::write(
                &path,
                r#"
[engines]
default_market_id = "${TEST_PRECIVOX_MARKET}"
rng_seed = 42
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.engines.default_market_id == "market-from-env",
                "market id should be interpolated from environment",
            )?;
            ensure(config.engines.rng_seed == Some(42), "rng seed should be read from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_PRECIVOX_MARKET"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRECIVOX_LOG_LEVEL", "warn");
        env::set_var("PRECIVOX_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["PRECIVOX_LOG_LEVEL", "PRECIVOX_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRECIVOX_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("PRECIVOX_ENGINES_BATCH_CONCURRENCY", "4");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("precivox.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[engines]
batch_concurrency = 2

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.engines.batch_concurrency == 4,
                "env batch concurrency should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["PRECIVOX_DATABASE_URL", "PRECIVOX_ENGINES_BATCH_CONCURRENCY"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRECIVOX_ENGINES_BATCH_CONCURRENCY", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("engines.batch_concurrency")
            );
            ensure(has_message, "validation failure should mention engines.batch_concurrency")
        })();

        clear_vars(&["PRECIVOX_ENGINES_BATCH_CONCURRENCY"]);
        result
    }

    #[test]
    fn malformed_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRECIVOX_ENGINES_RNG_SEED", "not-a-number");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "PRECIVOX_ENGINES_RNG_SEED", "error should name the offending key")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid override error".to_string()),
        };

        clear_vars(&["PRECIVOX_ENGINES_RNG_SEED"]);
        result
    }
}
