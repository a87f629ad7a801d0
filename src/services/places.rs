use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use crate::models::PlaceId;

/// Default endpoint of the Google Places web service
pub const DEFAULT_PLACES_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place";

/// Errors that can occur when calling the places search service
#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Search rejected with status {status}: {message}")]
    Status { status: String, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Parameters of one nearby search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbySearch {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: u32,
    pub sort_by_distance: bool,
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacesPage {
    pub place_ids: Vec<PlaceId>,
    pub next_page_token: Option<String>,
}

/// Nearby restaurant search, one page per call
#[async_trait]
pub trait PlacesSearch: Send + Sync {
    async fn nearby(
        &self,
        search: &NearbySearch,
        page_token: Option<&str>,
    ) -> Result<PlacesPage, PlacesError>;
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    next_page_token: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
}

/// Google Places nearby-search client
pub struct GooglePlacesClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GooglePlacesClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, PlacesError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn query_params(&self, search: &NearbySearch, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("location", format!("{},{}", search.latitude, search.longitude)),
            ("type", "restaurant".to_string()),
            ("key", self.api_key.clone()),
        ];

        // rankby=distance and radius are mutually exclusive
        if search.sort_by_distance {
            params.push(("rankby", "distance".to_string()));
        } else {
            params.push(("radius", search.radius_meters.to_string()));
        }

        if let Some(token) = page_token {
            params.push(("pagetoken", token.to_string()));
        }

        params
    }
}

#[async_trait]
impl PlacesSearch for GooglePlacesClient {
    async fn nearby(
        &self,
        search: &NearbySearch,
        page_token: Option<&str>,
    ) -> Result<PlacesPage, PlacesError> {
        let url = format!("{}/nearbysearch/json", self.base_url.trim_end_matches('/'));

        tracing::debug!(
            "Nearby search at ({}, {}) radius={}m by_distance={} continuation={}",
            search.latitude,
            search.longitude,
            search.radius_meters,
            search.sort_by_distance,
            page_token.is_some()
        );

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(search, page_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlacesError::ApiError(format!(
                "Nearby search failed: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let parsed: NearbyResponse = serde_json::from_str(&body)
            .map_err(|e| PlacesError::InvalidResponse(format!("Failed to parse nearby search: {}", e)))?;

        match parsed.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(PlacesPage {
                place_ids: parsed
                    .results
                    .into_iter()
                    .map(|r| PlaceId(r.place_id))
                    .collect(),
                next_page_token: parsed.next_page_token.filter(|t| !t.is_empty()),
            }),
            _ => Err(PlacesError::Status {
                status: parsed.status,
                message: parsed.error_message.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn search(sort_by_distance: bool) -> NearbySearch {
        NearbySearch {
            latitude: 12.9,
            longitude: 77.6,
            radius_meters: 1610,
            sort_by_distance,
        }
    }

    fn client(url: String) -> GooglePlacesClient {
        GooglePlacesClient::new(url, "test_key".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_first_page_with_cursor() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("location".into(), "12.9,77.6".into()),
                Matcher::UrlEncoded("radius".into(), "1610".into()),
                Matcher::UrlEncoded("type".into(), "restaurant".into()),
                Matcher::UrlEncoded("key".into(), "test_key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"OK","results":[{"place_id":"a"},{"place_id":"b"}],"next_page_token":"tok"}"#)
            .create_async()
            .await;

        let page = client(server.url()).nearby(&search(false), None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.place_ids, vec![PlaceId::from("a"), PlaceId::from("b")]);
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_continuation_ranked_by_distance() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("rankby".into(), "distance".into()),
                Matcher::UrlEncoded("pagetoken".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":"OK","results":[{"place_id":"c"}]}"#)
            .create_async()
            .await;

        let page = client(server.url()).nearby(&search(true), Some("tok")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.place_ids, vec![PlaceId::from("c")]);
        assert_eq!(page.next_page_token, None);
    }

    #[tokio::test]
    async fn test_zero_results_is_empty_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"ZERO_RESULTS","results":[]}"#)
            .create_async()
            .await;

        let page = client(server.url()).nearby(&search(false), None).await.unwrap();
        assert!(page.place_ids.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"OVER_QUERY_LIMIT","error_message":"slow down","results":[]}"#)
            .create_async()
            .await;

        let err = client(server.url()).nearby(&search(false), None).await.unwrap_err();
        assert!(matches!(err, PlacesError::Status { ref status, .. } if status == "OVER_QUERY_LIMIT"));
    }

    #[tokio::test]
    async fn test_garbage_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = client(server.url()).nearby(&search(false), None).await.unwrap_err();
        assert!(matches!(err, PlacesError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_http_failure_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = client(server.url()).nearby(&search(false), None).await.unwrap_err();
        assert!(matches!(err, PlacesError::ApiError(_)));
    }
}
