use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dish_discovery::config::Settings;
use dish_discovery::core::Discovery;
use dish_discovery::routes::{self, AppState};
use dish_discovery::services::{CacheManager, GooglePlacesClient, PostgresStore, TokenVerifier};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn io_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting dish discovery service...");

    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let store = PostgresStore::from_settings(
        &settings.database.url,
        Some(db_max_conn),
        settings.database.min_connections,
        settings.database.acquire_timeout_secs,
        settings.database.idle_timeout_secs,
    )
    .await
    .map_err(|e| io_error("PostgreSQL connection error", e))?;

    info!("PostgreSQL store initialized (max: {} connections, migrations applied)", db_max_conn);

    if settings.places.api_key.is_empty() {
        warn!("No places API key configured; nearby searches will be rejected upstream");
    }

    let places = GooglePlacesClient::new(
        settings.places.endpoint.clone(),
        settings.places.api_key.clone(),
        Duration::from_secs(settings.places.request_timeout_secs),
    )
    .map_err(|e| io_error("Places client error", e))?;

    let discovery_settings = settings.discovery_settings();
    info!("Discovery settings: {:?}", discovery_settings);

    let mut discovery = Discovery::new(Arc::new(places), Arc::new(store), discovery_settings);

    // Cache is optional; a Redis outage degrades to the in-process tier
    if settings.cache.enabled {
        let cache_ttl = settings.cache.ttl_secs.unwrap_or(120);
        let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

        let cache = match CacheManager::new(settings.cache.redis_url.as_deref(), l1_cache_size, cache_ttl).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using in-process cache only", e);
                CacheManager::local(l1_cache_size, cache_ttl)
            }
        };

        info!(
            "Cache manager initialized (L1: {} entries, TTL: {}s, {:?})",
            l1_cache_size,
            cache_ttl,
            cache.stats()
        );
        discovery = discovery.with_cache(Arc::new(cache));
    }

    let app_state = AppState {
        discovery,
        verifier: TokenVerifier::new(&settings.auth.jwt_secret),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(routes::handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
