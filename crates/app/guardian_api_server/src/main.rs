//! CityGuardian API server binary.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use guardian_api::{AppState, config::ApiConfig};
use guardian_core::store::Store;
use guardian_core::store::memory::MemoryStore;
use guardian_core::store::postgres::PgStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "guardian_api_server",
    about = "CityGuardian complaint API server",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// `serve` options, accepted without the subcommand name.
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve(ServeArgs),
    /// Wait until the database accepts connections, then exit.
    CheckDb(CheckDbArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// PostgreSQL via `DATABASE_URL`.
    Pg,
    /// Process-local maps; data is lost on exit.
    Memory,
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL; overrides `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Storage backend.
    #[arg(long, value_enum, env = "GUARDIAN_STORE", default_value_t = StoreKind::Pg)]
    store: StoreKind,
}

#[derive(Args, Debug, Clone)]
struct CheckDbArgs {
    /// PostgreSQL connection URL; overrides `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Connection attempts before giving up.
    #[arg(long, default_value_t = 10)]
    attempts: u32,

    /// Delay between attempts in milliseconds.
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,guardian_api=debug,guardian_core=debug")
        }))
        .init();

    let cli = Cli::parse();
    let mut config = ApiConfig::from_env();

    match cli.command.unwrap_or(Command::Serve(cli.serve)) {
        Command::Serve(args) => serve(&mut config, args).await,
        Command::CheckDb(args) => {
            let url = args.database_url.unwrap_or(config.database_url);
            let attempt = guardian_core::db::wait_for_database(
                &url,
                args.attempts,
                Duration::from_millis(args.delay_ms),
            )
            .await?;
            info!(attempt, "database check passed");
            Ok(())
        }
    }
}

async fn serve(config: &mut ApiConfig, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map(|(h, _)| h.to_string())
            .unwrap_or_else(|| "127.0.0.1".into());
        config.bind_addr = format!("{host}:{port}");
    }

    info!(?config, store = ?args.store, "starting guardian_api_server");

    let store: Arc<dyn Store> = match args.store {
        StoreKind::Pg => {
            info!(max_connections = args.max_connections, "configuring connection pool");
            let pool = guardian_core::db::connect_lazy(&config.database_url, args.max_connections)?;

            info!("running database migrations");
            guardian_api::migrate(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreKind::Memory => {
            warn!("using in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let media = config.media_intake();
    let state = AppState::new(store, media, config.clone());
    let app = guardian_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        // Without a signal handler, run until killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
