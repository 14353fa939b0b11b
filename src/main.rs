use std::net::SocketAddr;
use std::sync::Arc;

use tracing::Level;
use usergate::app::build_router;
use usergate::core::config::Config;
use usergate::core::db::{
    DbConfig, InMemoryUserStore, PgUserStore, UserStore, create_pool_with_migrations, health_check,
};

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().with_max_level(Level::WARN).init();
            tracing::error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    let level = if config.is_development() {
        Level::INFO
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: environment={:?}, database={}, api_prefix={}",
        config.environment,
        config.has_database(),
        config.api_prefix
    );

    // Persistent store when a database is configured, in-memory otherwise
    let (store, pool) = match DbConfig::from_config(&config) {
        Some(db_config) => match create_pool_with_migrations(&db_config).await {
            Ok(pool) => {
                if let Err(err) = health_check(&pool).await {
                    tracing::error!("Database health check failed: {}", err);
                    std::process::exit(1);
                }
                let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
                (store, Some(pool))
            }
            Err(err) => {
                tracing::error!("Failed to initialize database: {}", err);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory only");
            let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
            (store, None)
        }
    };

    let app = build_router(&config, store);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind {}: {}", addr, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Err(err) = served {
        tracing::error!("Server error: {}", err);
    }

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connection closed");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
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

    tracing::info!("Shutdown signal received, draining connections");
}
