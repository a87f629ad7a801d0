// Route exports
pub mod dishes;
pub mod gestures;

use actix_web::{error, http::StatusCode, web, HttpRequest, HttpResponse};
use crate::core::{Discovery, DiscoveryError};
use crate::models::ErrorResponse;
use crate::services::TokenVerifier;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub discovery: Discovery,
    pub verifier: TokenVerifier,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(dishes::configure)
            .configure(gestures::configure),
    );
}

impl error::ResponseError for DiscoveryError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            DiscoveryError::InvalidInput { field, .. } => ErrorResponse {
                error: "invalid_input".to_string(),
                message: self.to_string(),
                field: Some(field.clone()),
                status_code: 400,
            },
            DiscoveryError::Upstream(_) => ErrorResponse {
                error: "upstream_error".to_string(),
                message: "Nearby search failed".to_string(),
                field: None,
                status_code: 400,
            },
            DiscoveryError::Store(_) => ErrorResponse {
                error: "store_error".to_string(),
                message: "Restaurant lookup failed".to_string(),
                field: None,
                status_code: 400,
            },
        };
        HttpResponse::BadRequest().json(body)
    }
}

/// JSON error for extractor failures
#[derive(Debug)]
pub struct PayloadError(ErrorResponse);

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.0.error, self.0.message)
    }
}

impl error::ResponseError for PayloadError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(&self.0)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    PayloadError(ErrorResponse {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        field: None,
        status_code: 400,
    })
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query error on {}: {}", req.path(), err);
    PayloadError(ErrorResponse {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        field: None,
        status_code: 400,
    })
    .into()
}

fn authorization(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

fn unauthorized(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Unauthorized().json(ErrorResponse {
        error: "unauthorized".to_string(),
        message: message.into(),
        field: None,
        status_code: 401,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, ResponseError};

    #[actix_web::test]
    async fn test_invalid_input_names_field() {
        let err = DiscoveryError::InvalidInput {
            field: "cuisineArray".to_string(),
            message: "not a list".to_string(),
        };
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["field"], "cuisineArray");
        assert_eq!(json["status_code"], 400);
    }

    #[actix_web::test]
    async fn test_upstream_error_is_client_error() {
        let err = DiscoveryError::Upstream(crate::services::PlacesError::InvalidResponse("bad".to_string()));
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json.get("field").is_none());
    }
}
