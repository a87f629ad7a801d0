use futures::{stream, StreamExt, TryStreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use crate::models::{PlaceId, PreferenceCriteria, RestaurantCandidate};
use crate::services::{DiscoveryStore, StoreError};

/// How per-item store lookups are issued
///
/// Every mode yields the same output in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// One awaited lookup at a time
    Sequential,
    /// Up to `limit` lookups in flight, never fewer than one
    Concurrent { limit: usize },
    /// One batched query per stage
    Batch,
}

impl Default for LookupMode {
    fn default() -> Self {
        LookupMode::Batch
    }
}

/// Lookup mode as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupModeName {
    Sequential,
    Concurrent,
    #[default]
    Batch,
}

impl LookupMode {
    pub fn from_name(name: LookupModeName, concurrency: usize) -> Self {
        match name {
            LookupModeName::Sequential => LookupMode::Sequential,
            LookupModeName::Concurrent => LookupMode::Concurrent {
                limit: concurrency.max(1),
            },
            LookupModeName::Batch => LookupMode::Batch,
        }
    }
}

/// Turns place ids into local restaurants and their label-matching dishes
///
/// Place ids without a local restaurant inside the price and rating
/// windows are skipped. Output follows the order of `place_ids`.
pub async fn resolve(
    store: &dyn DiscoveryStore,
    place_ids: &[PlaceId],
    criteria: &PreferenceCriteria,
    mode: LookupMode,
) -> Result<Vec<RestaurantCandidate>, StoreError> {
    let candidates = match mode {
        LookupMode::Sequential => {
            let mut candidates = Vec::new();
            for place_id in place_ids {
                if let Some(candidate) = resolve_one(store, place_id, criteria).await? {
                    candidates.push(candidate);
                }
            }
            candidates
        }
        LookupMode::Concurrent { limit } => {
            let resolved: Vec<Option<RestaurantCandidate>> = stream::iter(place_ids)
                .map(|place_id| resolve_one(store, place_id, criteria))
                .buffered(limit.max(1))
                .try_collect()
                .await?;
            resolved.into_iter().flatten().collect()
        }
        LookupMode::Batch => resolve_batch(store, place_ids, criteria).await?,
    };

    tracing::debug!("Resolved {} of {} place ids to local restaurants", candidates.len(), place_ids.len());

    Ok(candidates)
}

async fn resolve_one(
    store: &dyn DiscoveryStore,
    place_id: &PlaceId,
    criteria: &PreferenceCriteria,
) -> Result<Option<RestaurantCandidate>, StoreError> {
    let Some(restaurant) = store.restaurant_by_place_id(place_id, criteria).await? else {
        return Ok(None);
    };

    let dishes = store
        .dishes_by_restaurant(restaurant.restaurant_info_id, &criteria.label_predicate)
        .await?;

    Ok(Some(RestaurantCandidate { restaurant, dishes }))
}

async fn resolve_batch(
    store: &dyn DiscoveryStore,
    place_ids: &[PlaceId],
    criteria: &PreferenceCriteria,
) -> Result<Vec<RestaurantCandidate>, StoreError> {
    if place_ids.is_empty() {
        return Ok(vec![]);
    }

    let mut by_place: HashMap<PlaceId, _> = store
        .restaurants_by_place_ids(place_ids, criteria)
        .await?
        .into_iter()
        .map(|r| (r.place_id.clone(), r))
        .collect();

    // Back to input order
    let restaurants: Vec<_> = place_ids
        .iter()
        .filter_map(|place_id| by_place.remove(place_id))
        .collect();

    if restaurants.is_empty() {
        return Ok(vec![]);
    }

    let restaurant_ids: Vec<_> = restaurants.iter().map(|r| r.restaurant_info_id).collect();
    let mut dishes = store
        .dishes_by_restaurants(&restaurant_ids, &criteria.label_predicate)
        .await?;

    Ok(restaurants
        .into_iter()
        .map(|restaurant| RestaurantCandidate {
            dishes: dishes.remove(&restaurant.restaurant_info_id).unwrap_or_default(),
            restaurant,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dish, LabelPredicate, RestaurantRecord, ValueWindow};
    use crate::services::MemoryStore;
    use uuid::Uuid;

    fn criteria(labels: LabelPredicate) -> PreferenceCriteria {
        PreferenceCriteria {
            price_window: ValueWindow::around(2.0, 1.0),
            rating_window: ValueWindow::around(4.0, 0.5),
            label_predicate: labels,
            sort_by_rating: false,
            sort_by_distance: false,
            radius_meters: 1610,
        }
    }

    fn seed(store: &MemoryStore, place: &str, rating: f64, price: i32, labels: &[&str]) -> Uuid {
        let id = Uuid::new_v4();
        store.add_restaurant(RestaurantRecord {
            restaurant_info_id: id,
            place_id: PlaceId::from(place),
            name: place.to_string(),
            latitude: 12.9,
            longitude: 77.6,
            price,
            rating,
            address: None,
            contact_no: None,
        });
        store.add_dish(Dish {
            restaurant_dish_id: Uuid::new_v4(),
            restaurant_info_id: id,
            dish_image_url: Some(format!("https://img/{}.jpg", place)),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        });
        id
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        // Seeded in a different order than queried
        seed(&store, "c", 4.5, 3, &["thai-dish"]);
        seed(&store, "a", 3.5, 1, &["place"]);
        seed(&store, "low", 3.4, 2, &["thai-dish"]);
        seed(&store, "pricey", 4.0, 4, &["thai-dish"]);
        seed(&store, "b", 4.0, 2, &["indian-dish"]);
        store
    }

    fn place_ids() -> Vec<PlaceId> {
        ["a", "missing", "b", "low", "pricey", "c"]
            .iter()
            .map(|s| PlaceId::from(*s))
            .collect()
    }

    fn names(candidates: &[RestaurantCandidate]) -> Vec<String> {
        candidates.iter().map(|c| c.restaurant.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_sequential_applies_windows_in_input_order() {
        let store = store();
        let result = resolve(&store, &place_ids(), &criteria(LabelPredicate::Any), LookupMode::Sequential)
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["a", "b", "c"]);
        assert_eq!(store.lookup_counts().restaurant, 6);
    }

    #[tokio::test]
    async fn test_all_modes_agree() {
        let store = store();
        let criteria = criteria(LabelPredicate::Any);
        let sequential = resolve(&store, &place_ids(), &criteria, LookupMode::Sequential).await.unwrap();
        let concurrent = resolve(&store, &place_ids(), &criteria, LookupMode::Concurrent { limit: 4 })
            .await
            .unwrap();
        let batch = resolve(&store, &place_ids(), &criteria, LookupMode::Batch).await.unwrap();

        assert_eq!(sequential, concurrent);
        assert_eq!(sequential, batch);
        assert_eq!(store.lookup_counts().restaurant_batch, 1);
        assert_eq!(store.lookup_counts().dishes_batch, 1);
    }

    #[tokio::test]
    async fn test_label_predicate_filters_dishes() {
        let store = store();
        let predicate = LabelPredicate::from_labels(vec!["thai".to_string()]);
        let result = resolve(&store, &place_ids(), &criteria(predicate), LookupMode::Batch)
            .await
            .unwrap();

        let dish_counts: Vec<usize> = result.iter().map(|c| c.dishes.len()).collect();
        assert_eq!(names(&result), vec!["a", "b", "c"]);
        assert_eq!(dish_counts, vec![0, 0, 1]);
    }

    #[tokio::test]
    async fn test_no_matches_is_empty() {
        let store = MemoryStore::new();
        let result = resolve(&store, &place_ids(), &criteria(LabelPredicate::Any), LookupMode::Batch)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_zero_concurrency_limit_resolves() {
        let store = store();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            resolve(
                &store,
                &place_ids(),
                &criteria(LabelPredicate::Any),
                LookupMode::Concurrent { limit: 0 },
            ),
        )
        .await
        .expect("lookups stalled")
        .unwrap();

        assert_eq!(names(&result), vec!["a", "b", "c"]);
    }
}
