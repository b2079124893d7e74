//! Context interpreter: the external text-generation collaborator.
//!
//! The service is treated as an opaque `generate(system, user) -> text`
//! function that may fail, time out, or return malformed output. Identical
//! inputs may yield different outputs across calls; every response goes
//! through schema validation before acceptance.

pub mod parse;
pub mod prompt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::InterpreterConfig;
use crate::error::{PregameError, Result};

pub use parse::{parse_and_validate, ValidationFailure};

/// Opaque text-generation seam. The engine only ever sees this trait, so
/// tests script it and the HTTP client stays at the edge.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String>;

    fn is_configured(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint
pub struct InterpreterClient {
    config: InterpreterConfig,
    http: Client,
}

impl InterpreterClient {
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PregameError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }
}

#[async_trait]
impl TextGenerator for InterpreterClient {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(PregameError::Interpreter(
                "interpreter API key not configured".to_string(),
            ));
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(model = %self.config.model, "sending interpreter request");

        // Timeout and network failure collapse into the same failure mode;
        // the engine treats them identically.
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PregameError::Interpreter(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "interpreter API error");
            return Err(PregameError::Interpreter(format!(
                "API error: {} - {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PregameError::Interpreter(format!("unreadable response body: {}", e)))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(PregameError::Interpreter("empty completion".to_string()));
        }

        debug!(response_len = content.len(), "interpreter response received");
        Ok(content)
    }
}
