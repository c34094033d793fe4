mod database;
mod openapi;
mod pagination;
mod query_params;
mod request_logging;
mod search;

use clap::{Parser, Subcommand};
use database::{Database, PoolSettings, DEFAULT_DATABASE_URL};
use openapi::{create_combined_api, ApiConfig};
use poem::{listener::TcpListener, middleware::Cors, EndpointExt, Route, Server};
use poem_openapi::OpenApiService;
use request_logging::RequestLogging;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "inventory-server")]
#[command(about = "Hardware inventory API server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migrations and start the API server
    Serve,
    /// Apply migrations and exit
    Migrate,
    /// Check database connectivity and schema state
    Doctor,
}

/// Reads `key` from the environment, falling back to `default` when unset or
/// unparsable
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn pool_settings() -> PoolSettings {
    let defaults = PoolSettings::default();
    PoolSettings {
        max_open_connections: env_or("DB_MAX_OPEN_CONNS", defaults.max_open_connections),
        max_idle_connections: env_or("DB_MAX_IDLE_CONNS", defaults.max_idle_connections),
        idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
    }
}

fn database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

async fn setup_database() -> Result<Database, std::io::Error> {
    let settings = pool_settings();
    match Database::new(&database_url(), &settings).await {
        Ok(db) => {
            tracing::info!(
                max_open = settings.max_open_connections,
                max_idle = settings.max_idle_connections,
                "Database initialized"
            );
            Ok(db)
        }
        Err(e) => {
            tracing::error!("Failed to initialize database: {:#}", e);
            Err(std::io::Error::other(format!(
                "Database initialization failed: {}",
                e
            )))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let cli = Cli::parse();

    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve => serve_command().await,
        Commands::Migrate => migrate_command().await,
        Commands::Doctor => doctor_command().await,
    }
}

async fn serve_command() -> Result<(), std::io::Error> {
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{}", port);

    let database = Arc::new(setup_database().await?);
    let config = ApiConfig {
        public_base_url: env::var("PUBLIC_BASE_URL").ok().filter(|v| !v.is_empty()),
    };

    let api_service = OpenApiService::new(
        create_combined_api(),
        "Hardware Inventory API",
        env!("CARGO_PKG_VERSION"),
    )
    .server("/api/v1");
    let swagger_ui = api_service.swagger_ui();
    let openapi_json = api_service.spec_endpoint();

    tracing::info!("Starting hardware inventory API server on {}", addr);

    let app = Route::new()
        .nest("/api/v1/docs", swagger_ui)
        .at("/api/v1/openapi.json", openapi_json)
        .nest("/api/v1", api_service)
        .data(database)
        .data(config)
        .with(Cors::new())
        .with(RequestLogging);

    Server::new(TcpListener::bind(&addr)).run(app).await
}

async fn migrate_command() -> Result<(), std::io::Error> {
    setup_database().await?;
    tracing::info!("Migrations applied");
    Ok(())
}

async fn doctor_command() -> Result<(), std::io::Error> {
    let db = Database::connect(&database_url(), &pool_settings())
        .await
        .map_err(|e| std::io::Error::other(format!("Database unreachable: {:#}", e)))?;
    tracing::info!("Database reachable");

    match db.schema_applied().await {
        Ok(true) => tracing::info!("Inventory schema is applied"),
        Ok(false) => tracing::warn!("Inventory schema is missing, run `inventory-server migrate`"),
        Err(e) => {
            return Err(std::io::Error::other(format!(
                "Schema check failed: {:#}",
                e
            )))
        }
    }
    Ok(())
}
