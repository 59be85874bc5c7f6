pub mod config;
pub mod migrate;
pub mod preferred;
pub mod profile;
pub mod recommend;
pub mod seed;

use agrimarket_core::config::{AppConfig, LoadOptions};
use agrimarket_db::{connect_with_config, migrations, DbPool};
use agrimarket_engine::{EngineError, EngineSettings, RecommendationEngine};
use serde::Serialize;
use serde_json::Value;

/// `(error_class, message, exit_code)` raised inside a command's async body.
pub(crate) type CommandFailure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub(crate) fn from_failure(command: &str, failure: CommandFailure) -> Self {
        let (error_class, message, exit_code) = failure;
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Connects and applies pending migrations, so every data command runs on a current schema.
pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

pub(crate) fn engine_for(pool: DbPool, config: &AppConfig) -> RecommendationEngine {
    RecommendationEngine::sqlite(pool, EngineSettings::from_config(&config.recommendation))
}

pub(crate) fn engine_failure(error: EngineError) -> CommandFailure {
    match &error {
        EngineError::CustomerNotFound(_) | EngineError::ListingNotFound(_) => {
            ("not_found", error.to_string(), 7)
        }
        EngineError::Domain(_) => ("invalid_input", error.to_string(), 9),
        EngineError::Repository(_) => ("persistence", error.to_string(), 8),
        EngineError::Model(_) => ("model", error.to_string(), 8),
    }
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<Value, CommandFailure> {
    serde_json::to_value(value).map_err(|error| ("serialization", error.to_string(), 10u8))
}

#[cfg(test)]
mod tests {
    use agrimarket_core::domain::customer::CustomerId;
    use agrimarket_core::errors::DomainError;
    use agrimarket_engine::EngineError;
    use serde_json::Value;

    use super::{engine_failure, CommandResult};

    #[test]
    fn success_payload_omits_absent_data() {
        let result = CommandResult::success("migrate", "applied pending migrations");
        let payload: Value = serde_json::from_str(&result.output).unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert!(payload["error_class"].is_null());
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn engine_failures_map_to_distinct_exit_codes() {
        let (class, message, code) = engine_failure(EngineError::CustomerNotFound(CustomerId(5)));
        assert_eq!((class, code), ("not_found", 7));
        assert_eq!(message, "customer 5 not found");

        let (class, _, code) = engine_failure(EngineError::Domain(DomainError::InvalidQuantity(0)));
        assert_eq!((class, code), ("invalid_input", 9));
    }
}
