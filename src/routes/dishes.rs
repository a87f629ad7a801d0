use actix_web::{web, HttpRequest, HttpResponse, Responder};
use crate::core::DiscoveryError;
use crate::models::{DiscoveryQuery, DiscoveryResponse, HealthResponse};
use super::{authorization, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/dishes", web::get().to(find_dishes));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = match state.discovery.store().health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Discover nearby dishes
///
/// GET /api/v1/dishes?latitude=12.9&longitude=77.6&restaurant_rating=4&cuisineArray[]=...
///
/// The caller is identified from an optional bearer token. Without one (or
/// with an invalid one) the request runs anonymously and no dislike
/// filtering is applied.
async fn find_dishes(
    state: web::Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    let query = DiscoveryQuery::from_pairs(&query).map_err(|e| {
        tracing::info!("Rejected discovery query: {} ({})", e.message, e.field);
        DiscoveryError::from(e)
    })?;

    let user_id = state.verifier.optional_user(authorization(&req));

    let result = state.discovery.discover(&query, user_id).await?;

    Ok(HttpResponse::Ok().json(DiscoveryResponse {
        dishes_info: result.restaurants,
    }))
}
