use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info};

use availability_api::{
    config::Config,
    create_router,
    db::{PgStore, SharedStore},
    middleware::init_tracing,
};

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize structured logging
    if let Err(e) = init_tracing(&config.environment) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }
    info!("Configuration loaded successfully: {:?}", config);

    let pg_config = match config.database.pg_config() {
        Ok(pg_config) => pg_config,
        Err(e) => {
            error!("Invalid database configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let store = match PgStore::new(pg_config) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to set up database access: {}", e);
            std::process::exit(1);
        }
    };

    // Run database migrations
    if config.database.run_migrations {
        if let Err(e) = store.migrate().await {
            error!("Failed to run database migrations: {}", e);
            std::process::exit(1);
        }
    } else {
        info!("Skipping database migrations");
    }

    // Create the Axum router with all endpoints
    let shared: SharedStore = Arc::new(store);
    let app = create_router(shared);

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Start the server with graceful shutdown handling
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Graceful shutdown signal handler
/// Listens for SIGTERM and SIGINT signals
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        },
    }
}
