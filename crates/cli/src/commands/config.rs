use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use agrimarket_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in effective_values(&config) {
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String, &'static [&'static str])> {
    vec![
        ("database.url", config.database.url.clone(), &["AGRIMARKET_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["AGRIMARKET_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["AGRIMARKET_DATABASE_TIMEOUT_SECS"],
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["AGRIMARKET_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["AGRIMARKET_SERVER_PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["AGRIMARKET_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "recommendation.forest_trees",
            config.recommendation.forest_trees.to_string(),
            &["AGRIMARKET_RECOMMENDATION_FOREST_TREES"],
        ),
        (
            "recommendation.forest_seed",
            config.recommendation.forest_seed.to_string(),
            &["AGRIMARKET_RECOMMENDATION_FOREST_SEED"],
        ),
        (
            "recommendation.recency_decay_per_day",
            config.recommendation.recency_decay_per_day.to_string(),
            &["AGRIMARKET_RECOMMENDATION_RECENCY_DECAY_PER_DAY"],
        ),
        (
            "recommendation.preferred_items_limit",
            config.recommendation.preferred_items_limit.to_string(),
            &["AGRIMARKET_RECOMMENDATION_PREFERRED_ITEMS_LIMIT"],
        ),
        (
            "recommendation.api_recommendation_limit",
            config.recommendation.api_recommendation_limit.to_string(),
            &["AGRIMARKET_RECOMMENDATION_API_RECOMMENDATION_LIMIT"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["AGRIMARKET_LOGGING_LEVEL", "AGRIMARKET_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["AGRIMARKET_LOGGING_FORMAT", "AGRIMARKET_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["agrimarket.toml", "config/agrimarket.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
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
