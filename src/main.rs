//! Cineteca Server
//!
//! A self-hosted movie catalog server with resumable chunked uploads and
//! Range-capable video playback.

use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cineteca_server::auth::{generate_salt, hash_password};
use cineteca_server::config::Config;
use cineteca_server::db::{self, UserRepository};
use cineteca_server::routes;
use cineteca_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cineteca_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Cineteca Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upload root: {}", config.storage.upload_dir.display());

    // Initialize database
    let db_pool = db::create_pool(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database initialized at {}", config.database.url);

    // Bootstrap admin account on first boot
    let salt = generate_salt();
    let digest = hash_password(&config.auth.admin_password, &salt);
    let created = UserRepository::new(&db_pool)
        .ensure_admin(&config.auth.admin_username, &digest, &salt)
        .await
        .context("Failed to bootstrap admin account")?;
    if created {
        tracing::info!(username = %config.auth.admin_username, "Created bootstrap admin account");
    }

    // Create application state (owns the upload coordinator and registry)
    let app_state = AppState::new(config.clone(), db_pool);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = routes::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server with graceful shutdown
    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::from([0u8, 0, 0, 0])),
        config.server.port,
    );
    tracing::info!("Cineteca Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
