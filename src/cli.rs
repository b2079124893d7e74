//! Command handlers behind the CLI binary.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::engine::{ProjectionEngine, ProjectionRequest};
use crate::error::{PregameError, Result};
use crate::interpreter::{InterpreterClient, TextGenerator};
use crate::store::{FeatureStore, MemoryStore, ModelStore, PostgresStore, ProjectionCache};

fn validated(config: &AppConfig) -> Result<()> {
    config.validate().map_err(|errors| {
        PregameError::InvalidRequest(format!("configuration invalid: {}", errors.join("; ")))
    })
}

async fn postgres_engine(config: &AppConfig) -> Result<ProjectionEngine> {
    validated(config)?;
    let store = Arc::new(
        PostgresStore::new(&config.store.database_url, config.store.max_connections).await?,
    );
    store.migrate().await?;

    let generator: Arc<dyn TextGenerator> =
        Arc::new(InterpreterClient::new(config.interpreter.clone())?);
    Ok(ProjectionEngine::new(
        store.clone() as Arc<dyn FeatureStore>,
        store.clone() as Arc<dyn ModelStore>,
        store as Arc<dyn ProjectionCache>,
        generator,
        config.engine.clone(),
        config.interpreter.failure_policy,
    ))
}

fn fixture_engine(config: &AppConfig, request: &ProjectionRequest, path: &Path) -> Result<ProjectionEngine> {
    let raw = std::fs::read_to_string(path)?;
    let fixture: serde_json::Value = serde_json::from_str(&raw)?;

    let store = Arc::new(MemoryStore::new());
    store.seed_fixture(&request.game_id, &request.model_version, &fixture)?;
    info!(fixture = %path.display(), "seeded in-memory store from fixture");

    let generator: Arc<dyn TextGenerator> =
        Arc::new(InterpreterClient::new(config.interpreter.clone())?);
    Ok(ProjectionEngine::new(
        store.clone() as Arc<dyn FeatureStore>,
        store.clone() as Arc<dyn ModelStore>,
        store as Arc<dyn ProjectionCache>,
        generator,
        config.engine.clone(),
        config.interpreter.failure_policy,
    ))
}

/// Run one projection request and print the response payload
pub async fn run_project(
    config: &AppConfig,
    request: ProjectionRequest,
    fixture: Option<&Path>,
) -> Result<()> {
    let engine = match fixture {
        Some(path) => fixture_engine(config, &request, path)?,
        None => postgres_engine(config).await?,
    };

    let response = engine.run(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Cache lookup only; never computes or calls the interpreter
pub async fn run_cached(config: &AppConfig, request: ProjectionRequest) -> Result<()> {
    let engine = postgres_engine(config).await?;
    match engine.cached(&request).await? {
        Some(response) => println!("{}", serde_json::to_string_pretty(&response)?),
        None => println!(
            "no cache entry for game {} model {}",
            request.game_id, request.model_version
        ),
    }
    Ok(())
}

/// Connectivity checks for the store and the interpreter configuration
pub async fn run_test(config: &AppConfig) -> Result<()> {
    validated(config)?;

    let store =
        PostgresStore::new(&config.store.database_url, config.store.max_connections).await?;
    store.ping().await?;
    println!("store: ok");

    let client = InterpreterClient::new(config.interpreter.clone())?;
    if client.is_configured() {
        println!("interpreter: configured ({})", config.interpreter.model);
    } else {
        println!("interpreter: NOT configured (set PREGAME_INTERPRETER__API_KEY)");
    }
    println!("failure policy: {:?}", config.interpreter.failure_policy);
    Ok(())
}
