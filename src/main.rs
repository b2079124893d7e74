use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pregame::cli;
use pregame::config::{AppConfig, LoggingConfig};
use pregame::engine::ProjectionRequest;
use pregame::error::Result;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pregame", about = "NBA stat-line projection engine", version)]
struct Cli {
    /// Configuration directory (default: ./config)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute (or return cached) projections for a game
    Project {
        #[arg(long)]
        game_id: String,
        #[arg(long)]
        model_version: String,
        /// Free-text context notes (injuries, minutes limits, pace)
        #[arg(long, default_value = "")]
        notes: String,
        /// JSON fixture file; runs against an in-memory store instead of
        /// Postgres
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// Look up a cached payload without computing
    Cached {
        #[arg(long)]
        game_id: String,
        #[arg(long)]
        model_version: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Check store connectivity and interpreter configuration
    Test,
}

fn load_config(cli: &Cli, allow_offline: bool) -> Result<AppConfig> {
    let loaded = match &cli.config_dir {
        Some(dir) => AppConfig::load_from(dir),
        None => AppConfig::load(),
    };
    match loaded {
        Ok(config) => Ok(config),
        Err(_) if allow_offline => Ok(AppConfig::offline()),
        Err(e) => Err(e.into()),
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Project {
            game_id,
            model_version,
            notes,
            fixture,
        } => {
            let config = load_config(&cli, fixture.is_some())?;
            init_logging(&config.logging);
            let request = ProjectionRequest {
                game_id: game_id.clone(),
                model_version: model_version.clone(),
                notes: notes.clone(),
            };
            cli::run_project(&config, request, fixture.as_deref()).await?;
        }
        Commands::Cached {
            game_id,
            model_version,
            notes,
        } => {
            let config = load_config(&cli, false)?;
            init_logging(&config.logging);
            let request = ProjectionRequest {
                game_id: game_id.clone(),
                model_version: model_version.clone(),
                notes: notes.clone(),
            };
            cli::run_cached(&config, request).await?;
        }
        Commands::Test => {
            let config = load_config(&cli, false)?;
            init_logging(&config.logging);
            cli::run_test(&config).await?;
        }
    }

    Ok(())
}
