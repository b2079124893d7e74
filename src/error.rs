use thiserror::Error;

/// Main error type for the projection engine
#[derive(Error, Debug)]
pub enum PregameError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Request errors (rejected before any external call)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Upstream data errors (store reachable but data missing/empty)
    #[error("Upstream data unavailable: {0}")]
    UpstreamData(String),

    // Interpreter call failures (network/timeout/non-2xx/empty body)
    #[error("Interpreter call failed: {0}")]
    Interpreter(String),

    // Interpreter responses rejected by schema validation
    #[error("Interpreter response rejected: {0}")]
    InterpreterValidation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for PregameError
pub type Result<T> = std::result::Result<T, PregameError>;

impl PregameError {
    /// Whether this error originated in the interpreter path (call or
    /// validation). The engine's fallback policy only degrades on these.
    pub fn is_interpreter_failure(&self) -> bool {
        matches!(
            self,
            PregameError::Interpreter(_) | PregameError::InterpreterValidation(_)
        )
    }
}
