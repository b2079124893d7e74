use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Postgres connection string for the feature/model/cache store
    pub database_url: String,
    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// What the engine does when the interpreter call fails or its response
/// fails validation after the single retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Degrade to the deterministic zero-delta baseline and succeed.
    Fallback,
    /// Surface a descriptive error to the caller.
    Strict,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Fallback
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterpreterConfig {
    /// API key for the text-generation service
    #[serde(default)]
    pub api_key: String,
    /// OpenAI-compatible API base URL
    #[serde(default = "default_interpreter_url")]
    pub base_url: String,
    /// Model to use
    #[serde(default = "default_interpreter_model")]
    pub model: String,
    /// Request timeout; timeout is treated like any other call failure
    #[serde(default = "default_interpreter_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_interpreter_url() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_interpreter_model() -> String {
    "grok-4-1-fast-reasoning".to_string()
}

fn default_interpreter_timeout() -> u64 {
    15
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4000
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_interpreter_url(),
            model: default_interpreter_model(),
            timeout_secs: default_interpreter_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl InterpreterConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Projected minutes when a player has no minutes figures at all
    #[serde(default = "default_minutes")]
    pub default_minutes: f64,
}

fn default_minutes() -> f64 {
    20.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_minutes: default_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("store.database_url", "")?
            .set_default("store.max_connections", 5)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PREGAME_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PREGAME_STORE__DATABASE_URL, etc.)
            .add_source(
                Environment::with_prefix("PREGAME")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration for fixture-backed runs that never touch Postgres
    pub fn offline() -> Self {
        Self {
            store: StoreConfig {
                database_url: String::new(),
                max_connections: 1,
            },
            interpreter: InterpreterConfig::default(),
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.store.database_url.is_empty() {
            errors.push("store.database_url must be set".to_string());
        }
        if self.store.max_connections == 0 {
            errors.push("store.max_connections must be at least 1".to_string());
        }
        if self.interpreter.timeout_secs == 0 {
            errors.push("interpreter.timeout_secs must be at least 1".to_string());
        }
        if self.interpreter.max_tokens == 0 {
            errors.push("interpreter.max_tokens must be at least 1".to_string());
        }
        if !(0.0..=2.0).contains(&self.interpreter.temperature) {
            errors.push("interpreter.temperature must be within [0.0, 2.0]".to_string());
        }
        if self.engine.default_minutes < 0.0 || self.engine.default_minutes > 42.0 {
            errors.push("engine.default_minutes must be within [0, 42]".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_defaults() {
        let cfg = AppConfig::offline();
        assert_eq!(cfg.engine.default_minutes, 20.0);
        assert_eq!(cfg.interpreter.timeout_secs, 15);
        assert_eq!(cfg.interpreter.failure_policy, FailurePolicy::Fallback);
        assert!(!cfg.interpreter.is_configured());
    }

    #[test]
    fn test_validate_rejects_empty_database_url() {
        let cfg = AppConfig::offline();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("database_url")));
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let mut cfg = AppConfig::offline();
        cfg.store.database_url = "postgres://localhost/pregame".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds() {
        let mut cfg = AppConfig::offline();
        cfg.store.database_url = "postgres://localhost/pregame".to_string();
        cfg.engine.default_minutes = 55.0;
        cfg.interpreter.timeout_secs = 0;
        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_failure_policy_parses_lowercase() {
        let parsed: FailurePolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(parsed, FailurePolicy::Strict);
        let parsed: FailurePolicy = serde_json::from_str("\"fallback\"").unwrap();
        assert_eq!(parsed, FailurePolicy::Fallback);
    }
}
