//! Storefront API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use storefront_api::config::AppConfig;
use storefront_api::error::AppError;
use storefront_api::state::AppState;
use storefront_api::{build_router, observability};
use storefront_catalog::memory_catalog::InMemoryCatalog;
use storefront_catalog::pg_catalog_store::PgCatalogStore;
use storefront_catalog::store::CatalogStore;
use storefront_core::clock::SystemClock;
use storefront_core::repository::EventRepository;
use storefront_event_store::memory_event_repository::InMemoryEventRepository;
use storefront_event_store::pg_event_repository::PgEventRepository;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        return Err(AppError::Config(format!("could not read .env: {e}")));
    }

    let config = AppConfig::from_env()?;
    let telemetry = observability::init(&config)?;

    info!("Starting storefront API server");

    let app_state = build_state(&config).await?;

    // TODO: Replace CorsLayer::permissive() with the storefront's origin once it is configurable.
    let app = build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.socket_addr()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    telemetry.shutdown();
    Ok(())
}

/// Wires stores to PostgreSQL when `DATABASE_URL` is set, else to memory.
async fn build_state(config: &AppConfig) -> Result<AppState, AppError> {
    let seed = match &config.catalog_path {
        Some(path) => Some(InMemoryCatalog::load(path).await?),
        None => None,
    };

    let (event_repository, catalog): (Arc<dyn EventRepository>, Arc<dyn CatalogStore>) =
        if let Some(database_url) = &config.database_url {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            info!("database migrations applied");

            let catalog = PgCatalogStore::new(pool.clone());
            if let Some(seed) = &seed {
                catalog.upsert_products(seed.products()).await?;
                info!(count = seed.len(), "catalog seeded");
            }
            (
                Arc::new(PgEventRepository::new(pool)),
                Arc::new(catalog),
            )
        } else {
            warn!("DATABASE_URL not set; carts and orders are kept in memory");
            let catalog = seed.unwrap_or_default();
            info!(count = catalog.len(), "in-memory catalog loaded");
            (
                Arc::new(InMemoryEventRepository::new()),
                Arc::new(catalog),
            )
        };

    Ok(AppState::new(
        Arc::new(SystemClock),
        event_repository,
        catalog,
        config.checkout_retry,
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
