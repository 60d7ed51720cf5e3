//! Panel Server - Main entry point

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use panel_core::{
    api::{self, AppState},
    config::{Config, RepositoryBackend},
    db::{InMemoryRepository, PgRepository, ResourceRepository},
    middleware::{generate_key, hash_token, ApiKeyStore},
    telemetry,
};

#[derive(Parser)]
#[command(name = "panel-server", version, about = "Panel Application API server")]
struct Cli {
    /// Configuration file path (environment variables still override it)
    #[arg(short, long, global = true, env = "PANEL_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Print a new application API key and its config entry
    GenerateKey {
        /// Free-form note stored with the key
        #[arg(long, default_value = "")]
        memo: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::GenerateKey { memo } => {
            print_new_key(&memo);
            Ok(())
        }
        Command::Serve => {
            let config = load_config(cli.config.as_deref())?;
            telemetry::init_telemetry(&config.logging, &config.metrics, &config.environment)?;
            serve(config).await
        }
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(path).with_context(|| format!("failed to load config from {}", path)),
        None => Config::load().context("failed to load config from environment"),
    }
}

async fn connect_postgres(config: &Config) -> anyhow::Result<PgRepository> {
    let url = config
        .repository
        .database_url
        .as_deref()
        .context("repository.database_url is not set")?;

    Ok(PgRepository::connect(
        url,
        config.repository.max_connections,
        config.repository.min_connections,
    )
    .await?)
}

async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn ResourceRepository>> {
    let repository: Arc<dyn ResourceRepository> = match config.repository.backend {
        RepositoryBackend::Memory => match &config.repository.seed_path {
            Some(path) => Arc::new(InMemoryRepository::from_seed_file(path)?),
            None => {
                warn!("Memory repository started without a seed file; all listings are empty");
                Arc::new(InMemoryRepository::new())
            }
        },
        RepositoryBackend::Postgres => Arc::new(connect_postgres(config).await?),
    };

    repository.ping().await?;
    Ok(repository)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        backend = ?config.repository.backend,
        "Starting Panel Server"
    );

    let repository = build_repository(&config).await?;

    let keys = Arc::new(ApiKeyStore::from_config(&config.api_keys));
    if keys.is_empty() {
        warn!("No API keys configured; every application request will be rejected");
    } else {
        info!(keys = keys.len(), "Loaded API keys");
    }

    let app = api::build_router(AppState::new(repository, keys, &config));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(address = %addr, public_url = %config.server.public_url, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn print_new_key(memo: &str) {
    let (identifier, token) = generate_key();

    println!("API key (shown once): {}{}", identifier, token);
    println!();
    println!("[[api_keys]]");
    println!("identifier = \"{}\"", identifier);
    println!("token_hash = \"{}\"", hash_token(&token));
    println!("memo = {:?}", memo);
    println!();
    println!("[api_keys.permissions]");
    println!("r_locations = 1");
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
