//! In-process collaborators.
//!
//! `MemoryStore` and `ScriptedPlaces` implement the same traits as the
//! Postgres store and the Google client. They back the test suites, the
//! benches and local runs without external services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;
use crate::models::{
    Dish, DishSummary, GestureStatus, GestureType, LabelPredicate, PlaceId, PreferenceCriteria,
    RestaurantRecord, StoredPreferences, UserGesture,
};
use crate::services::places::{NearbySearch, PlacesError, PlacesPage, PlacesSearch};
use crate::services::store::{DiscoveryStore, StoreError};

#[derive(Debug, Default)]
struct MemoryData {
    restaurants: Vec<RestaurantRecord>,
    dishes: Vec<Dish>,
    cuisines: HashMap<Uuid, String>,
    food_types: HashMap<Uuid, String>,
    preferences: HashMap<Uuid, StoredPreferences>,
    food_preferences: HashMap<Uuid, Vec<Uuid>>,
    gestures: Vec<UserGesture>,
}

/// Number of store calls made, per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupCounts {
    pub restaurant: usize,
    pub restaurant_batch: usize,
    pub dishes: usize,
    pub dishes_batch: usize,
    pub dislike_history: usize,
    pub dislike_history_batch: usize,
}

#[derive(Debug, Default)]
struct Counters {
    restaurant: AtomicUsize,
    restaurant_batch: AtomicUsize,
    dishes: AtomicUsize,
    dishes_batch: AtomicUsize,
    dislike_history: AtomicUsize,
    dislike_history_batch: AtomicUsize,
}

/// Discovery store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
    counters: Counters,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_restaurant(&self, restaurant: RestaurantRecord) {
        self.write().restaurants.push(restaurant);
    }

    pub fn add_dish(&self, dish: Dish) {
        self.write().dishes.push(dish);
    }

    pub fn add_cuisine(&self, id: Uuid, name: &str) {
        self.write().cuisines.insert(id, name.to_string());
    }

    pub fn add_food_type(&self, id: Uuid, name: &str) {
        self.write().food_types.insert(id, name.to_string());
    }

    pub fn set_preferences(&self, user_id: Uuid, preferences: StoredPreferences) {
        self.write().preferences.insert(user_id, preferences);
    }

    pub fn set_food_preferences(&self, user_id: Uuid, food_type_ids: Vec<Uuid>) {
        self.write().food_preferences.insert(user_id, food_type_ids);
    }

    /// Insert a gesture with an explicit timestamp
    pub fn add_gesture_at(
        &self,
        user_id: Uuid,
        restaurant_dish_id: Uuid,
        gesture_type: GestureType,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let user_gesture_id = Uuid::new_v4();
        self.write().gestures.push(UserGesture {
            user_gesture_id,
            user_id,
            restaurant_dish_id,
            gesture_type,
            status: GestureStatus::Active,
            created_at,
        });
        user_gesture_id
    }

    pub fn gesture(&self, user_gesture_id: Uuid) -> Option<UserGesture> {
        self.read()
            .gestures
            .iter()
            .find(|g| g.user_gesture_id == user_gesture_id)
            .cloned()
    }

    pub fn lookup_counts(&self) -> LookupCounts {
        LookupCounts {
            restaurant: self.counters.restaurant.load(Ordering::Relaxed),
            restaurant_batch: self.counters.restaurant_batch.load(Ordering::Relaxed),
            dishes: self.counters.dishes.load(Ordering::Relaxed),
            dishes_batch: self.counters.dishes_batch.load(Ordering::Relaxed),
            dislike_history: self.counters.dislike_history.load(Ordering::Relaxed),
            dislike_history_batch: self.counters.dislike_history_batch.load(Ordering::Relaxed),
        }
    }

    fn find_restaurant(&self, place_id: &PlaceId, criteria: &PreferenceCriteria) -> Option<RestaurantRecord> {
        self.read()
            .restaurants
            .iter()
            .find(|r| &r.place_id == place_id && criteria.admits(r))
            .cloned()
    }

    fn find_dishes(&self, restaurant_info_id: Uuid, labels: &LabelPredicate) -> Vec<Dish> {
        self.read()
            .dishes
            .iter()
            .filter(|d| d.restaurant_info_id == restaurant_info_id && labels.matches_dish(d))
            .cloned()
            .collect()
    }

    fn find_dislikes(&self, user_id: Uuid, restaurant_dish_id: Uuid) -> Vec<DateTime<Utc>> {
        self.read()
            .gestures
            .iter()
            .filter(|g| {
                g.user_id == user_id
                    && g.restaurant_dish_id == restaurant_dish_id
                    && g.gesture_type == GestureType::Dislike
                    && g.status == GestureStatus::Active
            })
            .map(|g| g.created_at)
            .collect()
    }

    fn labels_for(map: &HashMap<Uuid, String>, ids: &[Uuid]) -> HashMap<Uuid, String> {
        ids.iter()
            .filter_map(|id| map.get(id).map(|name| (*id, name.clone())))
            .collect()
    }
}

#[async_trait]
impl DiscoveryStore for MemoryStore {
    async fn restaurant_by_place_id(
        &self,
        place_id: &PlaceId,
        criteria: &PreferenceCriteria,
    ) -> Result<Option<RestaurantRecord>, StoreError> {
        self.counters.restaurant.fetch_add(1, Ordering::Relaxed);
        Ok(self.find_restaurant(place_id, criteria))
    }

    async fn restaurants_by_place_ids(
        &self,
        place_ids: &[PlaceId],
        criteria: &PreferenceCriteria,
    ) -> Result<Vec<RestaurantRecord>, StoreError> {
        self.counters.restaurant_batch.fetch_add(1, Ordering::Relaxed);
        // Storage order, like an unordered IN query
        Ok(self
            .read()
            .restaurants
            .iter()
            .filter(|r| place_ids.contains(&r.place_id) && criteria.admits(r))
            .cloned()
            .collect())
    }

    async fn dishes_by_restaurant(
        &self,
        restaurant_info_id: Uuid,
        labels: &LabelPredicate,
    ) -> Result<Vec<Dish>, StoreError> {
        self.counters.dishes.fetch_add(1, Ordering::Relaxed);
        Ok(self.find_dishes(restaurant_info_id, labels))
    }

    async fn dishes_by_restaurants(
        &self,
        restaurant_info_ids: &[Uuid],
        labels: &LabelPredicate,
    ) -> Result<HashMap<Uuid, Vec<Dish>>, StoreError> {
        self.counters.dishes_batch.fetch_add(1, Ordering::Relaxed);
        Ok(restaurant_info_ids
            .iter()
            .map(|id| (*id, self.find_dishes(*id, labels)))
            .collect())
    }

    async fn dislike_history(
        &self,
        user_id: Uuid,
        restaurant_dish_id: Uuid,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        self.counters.dislike_history.fetch_add(1, Ordering::Relaxed);
        Ok(self.find_dislikes(user_id, restaurant_dish_id))
    }

    async fn dislike_histories(
        &self,
        user_id: Uuid,
        restaurant_dish_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<DateTime<Utc>>>, StoreError> {
        self.counters.dislike_history_batch.fetch_add(1, Ordering::Relaxed);
        Ok(restaurant_dish_ids
            .iter()
            .map(|id| (*id, self.find_dislikes(user_id, *id)))
            .collect())
    }

    async fn user_preferences(&self, user_id: Uuid) -> Result<Option<StoredPreferences>, StoreError> {
        Ok(self.read().preferences.get(&user_id).cloned())
    }

    async fn user_food_type_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .read()
            .food_preferences
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn cuisine_labels(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError> {
        Ok(Self::labels_for(&self.read().cuisines, ids))
    }

    async fn food_labels(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError> {
        Ok(Self::labels_for(&self.read().food_types, ids))
    }

    async fn record_gesture(
        &self,
        user_id: Uuid,
        restaurant_dish_id: Uuid,
        gesture_type: GestureType,
    ) -> Result<UserGesture, StoreError> {
        let mut data = self.write();
        if !data.dishes.iter().any(|d| d.restaurant_dish_id == restaurant_dish_id) {
            return Err(StoreError::NotFound(format!("Dish {}", restaurant_dish_id)));
        }

        let gesture = UserGesture {
            user_gesture_id: Uuid::new_v4(),
            user_id,
            restaurant_dish_id,
            gesture_type,
            status: GestureStatus::Active,
            created_at: Utc::now(),
        };
        data.gestures.push(gesture.clone());
        Ok(gesture)
    }

    async fn latest_active_dislike(&self, user_id: Uuid) -> Result<Option<UserGesture>, StoreError> {
        Ok(self
            .read()
            .gestures
            .iter()
            .filter(|g| {
                g.user_id == user_id
                    && g.gesture_type == GestureType::Dislike
                    && g.status == GestureStatus::Active
            })
            .max_by_key(|g| g.created_at)
            .cloned())
    }

    async fn soft_delete_gesture(&self, user_gesture_id: Uuid) -> Result<bool, StoreError> {
        let mut data = self.write();
        match data
            .gestures
            .iter_mut()
            .find(|g| g.user_gesture_id == user_gesture_id && g.status == GestureStatus::Active)
        {
            Some(gesture) => {
                gesture.status = GestureStatus::Deleted;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn dish_summary(&self, restaurant_dish_id: Uuid) -> Result<Option<DishSummary>, StoreError> {
        let data = self.read();
        let Some(dish) = data.dishes.iter().find(|d| d.restaurant_dish_id == restaurant_dish_id) else {
            return Ok(None);
        };
        let Some(restaurant) = data
            .restaurants
            .iter()
            .find(|r| r.restaurant_info_id == dish.restaurant_info_id)
        else {
            return Ok(None);
        };

        Ok(Some(DishSummary {
            restaurant_info_id: restaurant.restaurant_info_id,
            restaurant_name: restaurant.name.clone(),
            location_lat: restaurant.latitude,
            location_long: restaurant.longitude,
            restaurant_price: restaurant.price,
            restaurant_dish_id: dish.restaurant_dish_id,
            dish_image_url: dish.dish_image_url.clone(),
        }))
    }
}

/// A recorded call to `ScriptedPlaces::nearby`
#[derive(Debug, Clone)]
pub struct PlacesCall {
    pub page_token: Option<String>,
    pub at: Instant,
}

/// Places search that replays a fixed sequence of pages
///
/// Page `n` is served for the continuation token `page-n`; the first page
/// answers a call without a token.
#[derive(Debug, Default)]
pub struct ScriptedPlaces {
    pages: Vec<Vec<PlaceId>>,
    trailing_cursor: bool,
    fail_on_page: Option<usize>,
    latency: Duration,
    calls: Mutex<Vec<PlacesCall>>,
}

impl ScriptedPlaces {
    pub fn new(pages: Vec<Vec<&str>>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|page| page.into_iter().map(PlaceId::from).collect())
                .collect(),
            ..Self::default()
        }
    }

    /// Keep offering a cursor after the last scripted page
    pub fn with_trailing_cursor(mut self) -> Self {
        self.trailing_cursor = true;
        self
    }

    /// Fail with a parse error when the given page (0-based) is requested
    pub fn failing_on(mut self, page: usize) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    /// Delay every response
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<PlacesCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PlacesSearch for ScriptedPlaces {
    async fn nearby(
        &self,
        _search: &NearbySearch,
        page_token: Option<&str>,
    ) -> Result<PlacesPage, PlacesError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PlacesCall {
                page_token: page_token.map(str::to_string),
                at: Instant::now(),
            });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| PlacesError::Status {
                    status: "INVALID_REQUEST".to_string(),
                    message: format!("unknown page token {}", token),
                })?,
        };

        if self.fail_on_page == Some(index) {
            return Err(PlacesError::InvalidResponse(format!("scripted failure on page {}", index)));
        }

        let place_ids = self.pages.get(index).cloned().unwrap_or_default();
        let has_more = index + 1 < self.pages.len() || self.trailing_cursor;

        Ok(PlacesPage {
            place_ids,
            next_page_token: has_more.then(|| format!("page-{}", index + 1)),
        })
    }
}
