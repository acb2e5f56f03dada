use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use dealroom::app::{build_router, AppState};
use dealroom::config::AppConfig;

#[derive(Parser)]
#[command(name = "dealroom")]
#[command(about = "M&A insights blog and deal model showcase")]
struct Cli {
    /// Configuration file (defaults to ./dealroom.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Create an admin account, or promote and reset an existing one
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dealroom=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Invalid configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    let mongo_client = mongodb::Client::with_uri_str(&config.mongodb_uri)
        .await
        .context("Failed to connect to MongoDB")?;
    let mongo_db = mongo_client.database(&config.mongodb_database);
    tracing::info!(database = %config.mongodb_database, "Connected to MongoDB");

    let state = AppState::from_database(&mongo_db, &config).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(state, &config).await,
        Commands::CreateAdmin {
            name,
            email,
            password,
        } => {
            let user =
                dealroom::api::users::ensure_admin(state.user_repo.as_ref(), &name, &email, &password)
                    .await?;
            tracing::info!(user_id = %user.id, email = %user.email, "Admin account ready");
            Ok(())
        }
    }
}

async fn serve(state: AppState, config: &AppConfig) -> anyhow::Result<()> {
    let app = build_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
