use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub recommendation: RecommendationConfig,
    pub logging: LoggingConfig,
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

/// Tunables for the propensity pipeline. The defaults reproduce the production model.
#[derive(Clone, Debug, PartialEq)]
pub struct RecommendationConfig {
    pub forest_trees: usize,
    pub forest_seed: u64,
    pub recency_decay_per_day: f64,
    pub preferred_items_limit: usize,
    pub api_recommendation_limit: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            forest_trees: 100,
            forest_seed: 42,
            recency_decay_per_day: 0.1,
            preferred_items_limit: 20,
            api_recommendation_limit: 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub log_format: Option<LogFormat>,
    pub server_port: Option<u16>,
    pub forest_trees: Option<usize>,
    pub forest_seed: Option<u64>,
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
                url: "sqlite://agrimarket.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            recommendation: RecommendationConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("agrimarket.toml"));
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

        if let Some(recommendation) = patch.recommendation {
            if let Some(forest_trees) = recommendation.forest_trees {
                self.recommendation.forest_trees = forest_trees;
            }
            if let Some(forest_seed) = recommendation.forest_seed {
                self.recommendation.forest_seed = forest_seed;
            }
            if let Some(decay) = recommendation.recency_decay_per_day {
                self.recommendation.recency_decay_per_day = decay;
            }
            if let Some(limit) = recommendation.preferred_items_limit {
                self.recommendation.preferred_items_limit = limit;
            }
            if let Some(limit) = recommendation.api_recommendation_limit {
                self.recommendation.api_recommendation_limit = limit;
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
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AGRIMARKET_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("AGRIMARKET_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("AGRIMARKET_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("AGRIMARKET_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("AGRIMARKET_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AGRIMARKET_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("AGRIMARKET_SERVER_PORT") {
            self.server.port = parse_env("AGRIMARKET_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("AGRIMARKET_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("AGRIMARKET_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("AGRIMARKET_RECOMMENDATION_FOREST_TREES") {
            self.recommendation.forest_trees =
                parse_env("AGRIMARKET_RECOMMENDATION_FOREST_TREES", &value)?;
        }
        if let Some(value) = read_env("AGRIMARKET_RECOMMENDATION_FOREST_SEED") {
            self.recommendation.forest_seed =
                parse_env("AGRIMARKET_RECOMMENDATION_FOREST_SEED", &value)?;
        }
        if let Some(value) = read_env("AGRIMARKET_RECOMMENDATION_RECENCY_DECAY_PER_DAY") {
            self.recommendation.recency_decay_per_day =
                parse_env("AGRIMARKET_RECOMMENDATION_RECENCY_DECAY_PER_DAY", &value)?;
        }
        if let Some(value) = read_env("AGRIMARKET_RECOMMENDATION_PREFERRED_ITEMS_LIMIT") {
            self.recommendation.preferred_items_limit =
                parse_env("AGRIMARKET_RECOMMENDATION_PREFERRED_ITEMS_LIMIT", &value)?;
        }
        if let Some(value) = read_env("AGRIMARKET_RECOMMENDATION_API_RECOMMENDATION_LIMIT") {
            self.recommendation.api_recommendation_limit =
                parse_env("AGRIMARKET_RECOMMENDATION_API_RECOMMENDATION_LIMIT", &value)?;
        }

        let log_level =
            read_env("AGRIMARKET_LOGGING_LEVEL").or_else(|| read_env("AGRIMARKET_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AGRIMARKET_LOGGING_FORMAT").or_else(|| read_env("AGRIMARKET_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
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
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(forest_trees) = overrides.forest_trees {
            self.recommendation.forest_trees = forest_trees;
        }
        if let Some(forest_seed) = overrides.forest_seed {
            self.recommendation.forest_seed = forest_seed;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_recommendation(&self.recommendation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("agrimarket.toml"), PathBuf::from("config/agrimarket.toml")]
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

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if recommendation.forest_trees == 0 || recommendation.forest_trees > 1000 {
        return Err(ConfigError::Validation(
            "recommendation.forest_trees must be in range 1..=1000".to_string(),
        ));
    }

    let decay = recommendation.recency_decay_per_day;
    if !decay.is_finite() || decay < 0.0 {
        return Err(ConfigError::Validation(
            "recommendation.recency_decay_per_day must be a finite, non-negative number"
                .to_string(),
        ));
    }

    if recommendation.preferred_items_limit == 0 {
        return Err(ConfigError::Validation(
            "recommendation.preferred_items_limit must be greater than zero".to_string(),
        ));
    }

    if recommendation.api_recommendation_limit == 0 {
        return Err(ConfigError::Validation(
            "recommendation.api_recommendation_limit must be greater than zero".to_string(),
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

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    recommendation: Option<RecommendationPatch>,
    logging: Option<LoggingPatch>,
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
struct RecommendationPatch {
    forest_trees: Option<usize>,
    forest_seed: Option<u64>,
    recency_decay_per_day: Option<f64>,
    preferred_items_limit: Option<usize>,
    api_recommendation_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
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
    fn defaults_match_production_recommendation_settings() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.recommendation.forest_trees == 100, "forest should default to 100 trees")?;
        ensure(config.recommendation.forest_seed == 42, "forest seed should default to 42")?;
        ensure(
            (config.recommendation.recency_decay_per_day - 0.1).abs() < f64::EPSILON,
            "recency decay should default to 0.1 per day",
        )?;
        ensure(config.recommendation.preferred_items_limit == 20, "preferred limit is 20")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_AGRIMARKET_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("agrimarket.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_AGRIMARKET_DB}"

[recommendation]
forest_trees = 25
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(config.recommendation.forest_trees == 25, "file should set forest size")?;
            Ok(())
        })();

        clear_vars(&["TEST_AGRIMARKET_DB"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AGRIMARKET_LOG_LEVEL", "warn");
        env::set_var("AGRIMARKET_LOG_FORMAT", "pretty");

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

        clear_vars(&["AGRIMARKET_LOG_LEVEL", "AGRIMARKET_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AGRIMARKET_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("AGRIMARKET_RECOMMENDATION_FOREST_SEED", "7");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("agrimarket.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[recommendation]
forest_seed = 3

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
                config.recommendation.forest_seed == 7,
                "env forest seed should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["AGRIMARKET_DATABASE_URL", "AGRIMARKET_RECOMMENDATION_FOREST_SEED"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { forest_trees: Some(0), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        }) {
            Ok(_) => {
                return Err("expected validation failure but config load succeeded".to_string())
            }
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("recommendation.forest_trees")
        );
        ensure(has_message, "validation failure should mention recommendation.forest_trees")
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AGRIMARKET_SERVER_PORT", "not-a-port");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["AGRIMARKET_SERVER_PORT"]);

        ensure(
            matches!(
                result,
                Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "AGRIMARKET_SERVER_PORT"
            ),
            "invalid port should surface as an env override error",
        )
    }

    #[test]
    fn non_sqlite_database_url_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://localhost/agrimarket".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::Validation(ref message)) if message.contains("database.url")),
            "postgres url should fail validation",
        )
    }
}
