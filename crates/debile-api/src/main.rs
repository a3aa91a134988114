//! Debile master server

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use debile_api::bootstrap::seed_catalog;
use debile_api::{AppState, routes};
use debile_config::MasterConfig;
use debile_core::credential::hash_password;
use debile_db::{NewUser, Store, create_pool, run_migrations};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "debile-master")]
#[command(about = "Debile build farm master", long_about = None)]
struct Cli {
    /// Path to the KDL configuration file
    #[arg(long, env = "DEBILE_CONFIG", default_value = "debile.kdl")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the RPC endpoint (default)
    Serve,
    /// Register an operator account
    CreateUser {
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "DEBILE_USER_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = MasterConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::CreateUser {
            name,
            email,
            password,
        } => {
            if config.database.is_none() {
                bail!("create-user needs a database node in the configuration");
            }
            let store = open_store(&config).await?;
            let user = store
                .users
                .create(NewUser {
                    name,
                    email,
                    password_hash: hash_password(&password),
                })
                .await?;
            info!(user = %user.name, "Created user");
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_store(config: &MasterConfig) -> anyhow::Result<Store> {
    let store = match &config.database {
        Some(db) => {
            info!("Connecting to database...");
            let pool = create_pool(&db.url, db.max_connections).await?;
            run_migrations(&pool).await?;
            info!("Database connected");
            Store::postgres(pool)
        }
        None => {
            warn!("No database configured, running on the in-memory store");
            Store::in_memory()
        }
    };

    seed_catalog(&store, config).await?;
    Ok(store)
}

async fn serve(config: MasterConfig) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let state = AppState::new(store, &config);

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let addr = config.server.listen;
    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
