use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use filmshelf_api::{
    api::{create_router, AppState},
    config::{CatalogBackend, Config},
    db,
    references::{
        CachedCatalog, CachedIdentity, FilmCatalog, HttpCatalog, IdentityReference, PgCatalog,
        PgIdGenerator, PgIdentity,
    },
    services::{InteractionService, ListService},
    store::{PgInteractionStore, PgListStore},
};

const DEFAULT_LOG_FILTER: &str = "info,filmshelf_api=debug,sqlx=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env()?;
    let store_timeout = Duration::from_secs(config.store_timeout_secs);

    let pool = db::create_pool(&config.database_url, config.db_max_connections, store_timeout)
        .await
        .context("Failed to connect to Postgres")?;
    db::run_migrations(&pool).await?;

    let mut identity: Arc<dyn IdentityReference> =
        Arc::new(PgIdentity::new(pool.clone(), config.image_base_url.clone()));
    let mut catalog: Arc<dyn FilmCatalog> = match config.catalog_backend {
        CatalogBackend::Postgres => {
            Arc::new(PgCatalog::new(pool.clone(), config.image_base_url.clone()))
        }
        CatalogBackend::Http => Arc::new(HttpCatalog::new(
            config.catalog_url.clone(),
            store_timeout,
        )?),
    };

    let cache_writer = match &config.redis_url {
        Some(redis_url) => {
            let client = db::create_redis_client(redis_url)?;
            let (cache, writer) = db::Cache::connect(client, config.cache_ttl_secs)
                .await
                .context("Failed to connect to Redis")?;
            identity = Arc::new(CachedIdentity::new(identity, cache.clone()));
            catalog = Arc::new(CachedCatalog::new(catalog, cache));
            Some(writer)
        }
        None => {
            tracing::info!("REDIS_URL not set, summary caching disabled");
            None
        }
    };

    tracing::info!(catalog = catalog.name(), "Catalog backend ready");

    let interactions = InteractionService::new(
        Arc::new(PgInteractionStore::new(pool.clone())),
        identity.clone(),
        catalog.clone(),
    );
    let lists = ListService::new(
        Arc::new(PgListStore::new(pool.clone())),
        identity,
        catalog,
        Arc::new(PgIdGenerator::new(pool.clone())),
    );

    let app = create_router(AppState::new(interactions, lists)).layer(CorsLayer::permissive());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
