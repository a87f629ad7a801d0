use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;
use crate::models::{
    Dish, DishSummary, GestureType, LabelPredicate, PlaceId, PreferenceCriteria, RestaurantRecord,
    StoredPreferences, UserGesture,
};

/// Errors raised by a discovery store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Keyed access to restaurants, dishes, preferences and gesture history
///
/// The per-key operations are the reference lookups. The batch variants
/// default to looping over them; backends that can answer a whole set in
/// one round-trip override them.
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// Restaurant for a place id, if it falls inside the price and rating windows
    async fn restaurant_by_place_id(
        &self,
        place_id: &PlaceId,
        criteria: &PreferenceCriteria,
    ) -> Result<Option<RestaurantRecord>, StoreError>;

    /// Dishes of a restaurant having at least one label accepted by `labels`
    async fn dishes_by_restaurant(
        &self,
        restaurant_info_id: Uuid,
        labels: &LabelPredicate,
    ) -> Result<Vec<Dish>, StoreError>;

    /// Creation times of the user's active dislikes of a dish
    async fn dislike_history(
        &self,
        user_id: Uuid,
        restaurant_dish_id: Uuid,
    ) -> Result<Vec<DateTime<Utc>>, StoreError>;

    async fn user_preferences(&self, user_id: Uuid) -> Result<Option<StoredPreferences>, StoreError>;

    async fn user_food_type_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    /// Display names of cuisines; unknown ids are absent from the map
    async fn cuisine_labels(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError>;

    /// Display names of food types; unknown ids are absent from the map
    async fn food_labels(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError>;

    async fn restaurants_by_place_ids(
        &self,
        place_ids: &[PlaceId],
        criteria: &PreferenceCriteria,
    ) -> Result<Vec<RestaurantRecord>, StoreError> {
        let mut restaurants = Vec::with_capacity(place_ids.len());
        for place_id in place_ids {
            if let Some(restaurant) = self.restaurant_by_place_id(place_id, criteria).await? {
                restaurants.push(restaurant);
            }
        }
        Ok(restaurants)
    }

    async fn dishes_by_restaurants(
        &self,
        restaurant_info_ids: &[Uuid],
        labels: &LabelPredicate,
    ) -> Result<HashMap<Uuid, Vec<Dish>>, StoreError> {
        let mut dishes = HashMap::with_capacity(restaurant_info_ids.len());
        for id in restaurant_info_ids {
            dishes.insert(*id, self.dishes_by_restaurant(*id, labels).await?);
        }
        Ok(dishes)
    }

    async fn dislike_histories(
        &self,
        user_id: Uuid,
        restaurant_dish_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<DateTime<Utc>>>, StoreError> {
        let mut histories = HashMap::with_capacity(restaurant_dish_ids.len());
        for id in restaurant_dish_ids {
            histories.insert(*id, self.dislike_history(user_id, *id).await?);
        }
        Ok(histories)
    }

    async fn record_gesture(
        &self,
        user_id: Uuid,
        restaurant_dish_id: Uuid,
        gesture_type: GestureType,
    ) -> Result<UserGesture, StoreError>;

    /// Most recent active dislike of the user
    async fn latest_active_dislike(&self, user_id: Uuid) -> Result<Option<UserGesture>, StoreError>;

    /// Mark a gesture deleted; returns false if it was not active
    async fn soft_delete_gesture(&self, user_gesture_id: Uuid) -> Result<bool, StoreError>;

    async fn dish_summary(&self, restaurant_dish_id: Uuid) -> Result<Option<DishSummary>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
