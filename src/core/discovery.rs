use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use crate::core::{
    criteria::build_criteria,
    distance::display_km,
    exclusion::{filter_disliked_dishes, ExclusionPolicy},
    paginator::{PaginatorConfig, PlacesPaginator},
    ranking::rank,
    resolver::{resolve, LookupMode},
};
use crate::models::{DiscoveryQuery, FieldError, PlaceId, PreferenceCriteria, RestaurantView};
use crate::services::{CacheKey, CacheManager, DiscoveryStore, NearbySearch, PlacesError, PlacesSearch, StoreError};

/// A discovery request failed as a whole
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Places search failed: {0}")]
    Upstream(#[from] PlacesError),

    #[error("Store lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl From<FieldError> for DiscoveryError {
    fn from(err: FieldError) -> Self {
        DiscoveryError::InvalidInput {
            field: err.field,
            message: err.message,
        }
    }
}

/// Tunables of the discovery pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscoverySettings {
    pub paginator: PaginatorConfig,
    pub lookup: LookupMode,
    pub exclusion: ExclusionPolicy,
    /// Miles
    pub default_radius_miles: u32,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            paginator: PaginatorConfig::default(),
            lookup: LookupMode::default(),
            exclusion: ExclusionPolicy::default(),
            default_radius_miles: 1,
        }
    }
}

/// Outcome of a discovery request
#[derive(Debug)]
pub struct DiscoveryResult {
    pub restaurants: Vec<RestaurantView>,
    pub total_places: usize,
}

/// Discovery orchestrator
///
/// # Pipeline Stages
/// 1. Criteria from stored preferences or request parameters
/// 2. Paginated nearby search for place ids
/// 3. Resolution to local restaurants and label-matching dishes
/// 4. Dislike exclusion (authenticated callers only)
/// 5. Optional rating sort
///
/// Any failing stage fails the request; partial results are never returned.
#[derive(Clone)]
pub struct Discovery {
    places: Arc<dyn PlacesSearch>,
    store: Arc<dyn DiscoveryStore>,
    cache: Option<Arc<CacheManager>>,
    settings: DiscoverySettings,
}

impl Discovery {
    pub fn new(
        places: Arc<dyn PlacesSearch>,
        store: Arc<dyn DiscoveryStore>,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            places,
            store,
            cache: None,
            settings,
        }
    }

    /// Cache place ids of recent searches
    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn store(&self) -> &Arc<dyn DiscoveryStore> {
        &self.store
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    pub async fn discover(
        &self,
        query: &DiscoveryQuery,
        user_id: Option<Uuid>,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        self.discover_on(query, user_id, Utc::now().date_naive()).await
    }

    /// Run the pipeline with an explicit "today" for the dislike cooldown
    pub async fn discover_on(
        &self,
        query: &DiscoveryQuery,
        user_id: Option<Uuid>,
        today: NaiveDate,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        let criteria = build_criteria(
            self.store.as_ref(),
            user_id,
            query,
            self.settings.default_radius_miles,
        )
        .await?;

        let search = NearbySearch {
            latitude: query.latitude,
            longitude: query.longitude,
            radius_meters: criteria.radius_meters,
            sort_by_distance: criteria.sort_by_distance,
        };

        let place_ids = self.place_ids(&search).await?;
        let total_places = place_ids.len();

        let candidates = resolve(self.store.as_ref(), &place_ids, &criteria, self.settings.lookup).await?;

        let candidates = filter_disliked_dishes(
            self.store.as_ref(),
            candidates,
            user_id,
            &self.settings.exclusion,
            self.settings.lookup,
            today,
        )
        .await?;

        let restaurants = shape(rank(candidates, criteria.sort_by_rating), query);

        log_summary(&criteria, user_id, total_places, restaurants.len());

        Ok(DiscoveryResult {
            restaurants,
            total_places,
        })
    }

    async fn place_ids(&self, search: &NearbySearch) -> Result<Vec<PlaceId>, PlacesError> {
        let key = CacheKey::place_ids(search);

        if let Some(cache) = &self.cache {
            match cache.get::<Vec<PlaceId>>(&key).await {
                Ok(ids) => {
                    tracing::debug!("Serving {} place ids from cache", ids.len());
                    return Ok(ids);
                }
                Err(crate::services::CacheError::CacheMiss(_)) => {}
                Err(e) => tracing::warn!("Place id cache read failed: {}", e),
            }
        }

        let fetch = PlacesPaginator::new(self.places.as_ref(), self.settings.paginator)
            .fetch_place_ids(search)
            .await
            .map_err(|e| {
                tracing::error!("Nearby search failed: {}", e);
                e
            })?;

        // A truncated id set is served once but never cached
        if let Some(cache) = self.cache.as_ref().filter(|_| fetch.complete) {
            if let Err(e) = cache.set(&key, &fetch.place_ids).await {
                tracing::warn!("Place id cache write failed: {}", e);
            }
        }

        Ok(fetch.place_ids)
    }
}

fn shape(candidates: Vec<crate::models::RestaurantCandidate>, query: &DiscoveryQuery) -> Vec<RestaurantView> {
    candidates
        .into_iter()
        .map(|candidate| {
            let distance_km = display_km(
                query.latitude,
                query.longitude,
                candidate.restaurant.latitude,
                candidate.restaurant.longitude,
            );
            RestaurantView::from_candidate(candidate, distance_km)
        })
        .collect()
}

fn log_summary(criteria: &PreferenceCriteria, user_id: Option<Uuid>, places: usize, restaurants: usize) {
    tracing::info!(
        "Discovery for {}: {} places -> {} restaurants (radius={}m, sort_by_rating={})",
        user_id.map(|u| u.to_string()).unwrap_or_else(|| "anonymous".to_string()),
        places,
        restaurants,
        criteria.radius_meters,
        criteria.sort_by_rating
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dish, GestureType, RestaurantRecord};
    use crate::services::{MemoryStore, ScriptedPlaces};
    use chrono::TimeZone;
    use std::time::Duration;

    fn settings() -> DiscoverySettings {
        DiscoverySettings {
            paginator: PaginatorConfig {
                max_pages: 3,
                page_delay: Duration::from_millis(5),
                continuation_timeout: Duration::from_secs(5),
            },
            ..DiscoverySettings::default()
        }
    }

    fn query() -> DiscoveryQuery {
        DiscoveryQuery {
            latitude: 12.9,
            longitude: 77.6,
            restaurant_distance: None,
            restaurant_price: None,
            restaurant_rating: None,
            sort_by_rating: None,
            sort_by_distance: None,
            cuisine_ids: vec![],
            food_ids: vec![],
        }
    }

    fn seed(store: &MemoryStore, place: &str, rating: f64) -> Uuid {
        let restaurant_info_id = Uuid::new_v4();
        let dish_id = Uuid::new_v4();
        store.add_restaurant(RestaurantRecord {
            restaurant_info_id,
            place_id: PlaceId::from(place),
            name: place.to_string(),
            latitude: 12.91,
            longitude: 77.6,
            price: 2,
            rating,
            address: None,
            contact_no: None,
        });
        store.add_dish(Dish {
            restaurant_dish_id: dish_id,
            restaurant_info_id,
            dish_image_url: None,
            labels: vec!["place".to_string()],
        });
        dish_id
    }

    #[tokio::test]
    async fn test_upstream_failure_fails_request() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "a", 4.0);
        let places = Arc::new(ScriptedPlaces::new(vec![vec!["a"], vec!["b"]]).failing_on(1));
        let discovery = Discovery::new(places, store, settings());

        let result = discovery.discover(&query(), None).await;
        assert!(matches!(result, Err(DiscoveryError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_authenticated_dislike_removed_and_restaurant_kept() {
        let store = Arc::new(MemoryStore::new());
        let dish = seed(&store, "a", 4.0);
        let user = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        store.add_gesture_at(
            user,
            dish,
            GestureType::Dislike,
            Utc.from_utc_datetime(&today.and_hms_opt(8, 0, 0).unwrap()),
        );

        let places = Arc::new(ScriptedPlaces::new(vec![vec!["a"]]));
        let discovery = Discovery::new(places, store.clone(), settings());

        let anonymous = discovery.discover_on(&query(), None, today).await.unwrap();
        assert_eq!(anonymous.restaurants[0].restaurant_dishes.len(), 1);

        let signed_in = discovery.discover_on(&query(), Some(user), today).await.unwrap();
        assert_eq!(signed_in.restaurants.len(), 1);
        assert!(signed_in.restaurants[0].restaurant_dishes.is_empty());
    }

    #[tokio::test]
    async fn test_cache_skips_second_search() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "a", 4.0);
        let places = Arc::new(ScriptedPlaces::new(vec![vec!["a"]]));
        let discovery = Discovery::new(places.clone(), store, settings())
            .with_cache(Arc::new(CacheManager::local(100, 60)));

        let first = discovery.discover(&query(), None).await.unwrap();
        let second = discovery.discover(&query(), None).await.unwrap();

        assert_eq!(first.restaurants.len(), 1);
        assert_eq!(second.restaurants.len(), 1);
        assert_eq!(places.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_search_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "a", 4.0);
        seed(&store, "b", 4.0);
        let places = Arc::new(ScriptedPlaces::new(vec![vec!["a"], vec!["b"]]));
        let settings = DiscoverySettings {
            paginator: PaginatorConfig {
                max_pages: 3,
                page_delay: Duration::from_millis(200),
                continuation_timeout: Duration::from_millis(50),
            },
            ..DiscoverySettings::default()
        };
        let discovery = Discovery::new(places.clone(), store, settings)
            .with_cache(Arc::new(CacheManager::local(100, 120)));

        let first = discovery.discover(&query(), None).await.unwrap();
        let second = discovery.discover(&query(), None).await.unwrap();

        assert_eq!(first.restaurants.len(), 1);
        assert_eq!(second.restaurants.len(), 1);
        let first_page_calls = places.calls().iter().filter(|c| c.page_token.is_none()).count();
        assert_eq!(first_page_calls, 2);
    }

    #[tokio::test]
    async fn test_distance_reported() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "a", 4.0);
        let places = Arc::new(ScriptedPlaces::new(vec![vec!["a"]]));
        let discovery = Discovery::new(places, store, settings());

        let result = discovery.discover(&query(), None).await.unwrap();
        assert!((result.restaurants[0].distance_km - 1.112).abs() < 0.01);
        assert_eq!(result.total_places, 1);
    }
}
