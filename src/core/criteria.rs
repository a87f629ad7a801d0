use std::collections::HashMap;
use uuid::Uuid;
use crate::core::discovery::DiscoveryError;
use crate::models::{DiscoveryQuery, LabelPredicate, PreferenceCriteria, StoredPreferences, ValueWindow};
use crate::services::DiscoveryStore;

/// Conversion factor applied to distances given in miles
pub const METERS_PER_MILE: u32 = 1610;

/// Rating targets at or below this value leave the rating window open
pub const RATING_FLOOR: f64 = 3.0;

/// Largest radius the nearby search accepts
pub const MAX_RADIUS_METERS: u32 = 50_000;

const RATING_TOLERANCE: f64 = 0.5;
const PRICE_TOLERANCE: f64 = 1.0;

/// `[t - 0.5, t + 0.5]` for targets above the floor, otherwise open
pub fn rating_window(target: Option<f64>) -> ValueWindow {
    match target {
        Some(t) if t > RATING_FLOOR => ValueWindow::around(t, RATING_TOLERANCE),
        _ => ValueWindow::OPEN,
    }
}

/// `[p - 1, p + 1]` for positive targets, otherwise open
pub fn price_window(target: Option<f64>) -> ValueWindow {
    match target {
        Some(p) if p > 0.0 => ValueWindow::around(p, PRICE_TOLERANCE),
        _ => ValueWindow::OPEN,
    }
}

pub fn radius_meters(miles: Option<u32>, default_miles: u32) -> u32 {
    miles
        .filter(|m| *m > 0)
        .unwrap_or(default_miles)
        .saturating_mul(METERS_PER_MILE)
        .min(MAX_RADIUS_METERS)
}

/// Scalar filters before label resolution
#[derive(Debug, Clone, Default, PartialEq)]
struct ScalarPreferences {
    rating: Option<f64>,
    price: Option<f64>,
    distance_miles: Option<u32>,
    sort_by_rating: bool,
    sort_by_distance: bool,
}

impl ScalarPreferences {
    fn from_stored(stored: &StoredPreferences) -> Self {
        let price = stored.restaurant_price.as_deref().and_then(|raw| {
            let parsed = raw.trim().parse::<f64>().ok();
            if parsed.is_none() {
                tracing::warn!("Ignoring unparseable stored price preference '{}'", raw);
            }
            parsed
        });

        Self {
            rating: stored.restaurant_rating.map(f64::from),
            price,
            distance_miles: stored
                .restaurant_distance
                .and_then(|d| u32::try_from(d).ok()),
            sort_by_rating: stored.sort_by_rating.unwrap_or(false),
            sort_by_distance: stored.sort_by_distance.unwrap_or(false),
        }
    }

    fn from_query(query: &DiscoveryQuery) -> Self {
        Self {
            rating: query.restaurant_rating,
            price: query.restaurant_price,
            distance_miles: query.restaurant_distance,
            sort_by_rating: query.sort_by_rating.unwrap_or(false),
            sort_by_distance: query.sort_by_distance.unwrap_or(false),
        }
    }
}

/// Build the request's criteria
///
/// Authenticated callers are filtered by their stored preferences and food
/// types; request parameters are only consulted for anonymous callers. The
/// cuisine selection always comes from the request.
pub async fn build_criteria(
    store: &dyn DiscoveryStore,
    user_id: Option<Uuid>,
    query: &DiscoveryQuery,
    default_radius_miles: u32,
) -> Result<PreferenceCriteria, DiscoveryError> {
    let (scalars, food_ids, strict_food_ids) = match user_id {
        Some(user_id) => {
            let stored = store.user_preferences(user_id).await?.unwrap_or_default();
            let food_ids = store.user_food_type_ids(user_id).await?;
            (ScalarPreferences::from_stored(&stored), food_ids, false)
        }
        None => (ScalarPreferences::from_query(query), query.food_ids.clone(), true),
    };

    let mut labels = Vec::new();

    let cuisine_names = store.cuisine_labels(&query.cuisine_ids).await?;
    collect_labels(&mut labels, &query.cuisine_ids, &cuisine_names, "cuisineArray", true)?;

    let food_names = store.food_labels(&food_ids).await?;
    collect_labels(&mut labels, &food_ids, &food_names, "foodArray", strict_food_ids)?;

    Ok(PreferenceCriteria {
        price_window: price_window(scalars.price),
        rating_window: rating_window(scalars.rating),
        label_predicate: LabelPredicate::from_labels(labels),
        sort_by_rating: scalars.sort_by_rating,
        sort_by_distance: scalars.sort_by_distance,
        radius_meters: radius_meters(scalars.distance_miles, default_radius_miles),
    })
}

/// Append display names in selection order. Unknown ids are a caller error
/// when `strict`, otherwise stale stored data that is skipped.
fn collect_labels(
    labels: &mut Vec<String>,
    ids: &[Uuid],
    names: &HashMap<Uuid, String>,
    field: &str,
    strict: bool,
) -> Result<(), DiscoveryError> {
    for id in ids {
        match names.get(id) {
            Some(name) if !labels.contains(name) => labels.push(name.clone()),
            Some(_) => {}
            None if strict => {
                return Err(DiscoveryError::InvalidInput {
                    field: field.to_string(),
                    message: format!("unknown id {}", id),
                })
            }
            None => tracing::warn!("Skipping unknown stored {} entry {}", field, id),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

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

    #[test]
    fn test_rating_window_floor() {
        assert_eq!(rating_window(Some(4.0)), ValueWindow { min: 3.5, max: 4.5 });
        assert_eq!(rating_window(Some(3.0)), ValueWindow::OPEN);
        assert_eq!(rating_window(None), ValueWindow::OPEN);
    }

    #[test]
    fn test_price_window() {
        assert_eq!(price_window(Some(2.0)), ValueWindow { min: 1.0, max: 3.0 });
        assert_eq!(price_window(Some(0.0)), ValueWindow::OPEN);
        assert_eq!(price_window(None), ValueWindow::OPEN);
    }

    #[test]
    fn test_radius_conversion() {
        assert_eq!(radius_meters(None, 1), 1610);
        assert_eq!(radius_meters(Some(3), 1), 4830);
        assert_eq!(radius_meters(Some(0), 1), 1610);
        assert_eq!(radius_meters(Some(100), 1), MAX_RADIUS_METERS);
    }

    #[tokio::test]
    async fn test_anonymous_uses_query() {
        let store = MemoryStore::new();
        let mut q = query();
        q.restaurant_rating = Some(4.0);
        q.restaurant_price = Some(2.0);
        q.restaurant_distance = Some(2);
        q.sort_by_rating = Some(true);

        let criteria = build_criteria(&store, None, &q, 1).await.unwrap();

        assert_eq!(criteria.rating_window, ValueWindow { min: 3.5, max: 4.5 });
        assert_eq!(criteria.price_window, ValueWindow { min: 1.0, max: 3.0 });
        assert_eq!(criteria.radius_meters, 3220);
        assert!(criteria.sort_by_rating);
        assert_eq!(criteria.label_predicate, LabelPredicate::Any);
    }

    #[tokio::test]
    async fn test_authenticated_ignores_query_scalars() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.set_preferences(
            user,
            StoredPreferences {
                restaurant_rating: Some(5),
                restaurant_price: Some("3".to_string()),
                restaurant_distance: None,
                sort_by_distance: Some(true),
                sort_by_rating: None,
            },
        );

        let mut q = query();
        q.restaurant_rating = Some(4.0);
        q.restaurant_distance = Some(5);
        q.sort_by_rating = Some(true);

        let criteria = build_criteria(&store, Some(user), &q, 1).await.unwrap();

        assert_eq!(criteria.rating_window, ValueWindow { min: 4.5, max: 5.5 });
        assert_eq!(criteria.price_window, ValueWindow { min: 2.0, max: 4.0 });
        assert_eq!(criteria.radius_meters, 1610);
        assert!(criteria.sort_by_distance);
        assert!(!criteria.sort_by_rating);
    }

    #[tokio::test]
    async fn test_authenticated_without_stored_preferences_is_open() {
        let store = MemoryStore::new();
        let mut q = query();
        q.restaurant_rating = Some(4.5);

        let criteria = build_criteria(&store, Some(Uuid::new_v4()), &q, 1).await.unwrap();
        assert_eq!(criteria.rating_window, ValueWindow::OPEN);
    }

    #[tokio::test]
    async fn test_labels_resolved_from_cuisines_and_foods() {
        let store = MemoryStore::new();
        let (thai, veg) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_cuisine(thai, "thai");
        store.add_food_type(veg, "vegan");

        let mut q = query();
        q.cuisine_ids = vec![thai];
        q.food_ids = vec![veg];

        let criteria = build_criteria(&store, None, &q, 1).await.unwrap();
        assert_eq!(
            criteria.label_predicate,
            LabelPredicate::OneOf(vec!["thai".to_string(), "vegan".to_string()])
        );
    }

    #[tokio::test]
    async fn test_authenticated_food_types_come_from_store() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (stored_food, query_food) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_food_type(stored_food, "noodles");
        store.add_food_type(query_food, "pizza");
        store.set_food_preferences(user, vec![stored_food, Uuid::new_v4()]);

        let mut q = query();
        q.food_ids = vec![query_food];

        let criteria = build_criteria(&store, Some(user), &q, 1).await.unwrap();
        assert_eq!(
            criteria.label_predicate,
            LabelPredicate::OneOf(vec!["noodles".to_string()])
        );
    }

    #[tokio::test]
    async fn test_unknown_cuisine_names_field() {
        let store = MemoryStore::new();
        let mut q = query();
        q.cuisine_ids = vec![Uuid::new_v4()];

        let err = build_criteria(&store, None, &q, 1).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidInput { ref field, .. } if field == "cuisineArray"));
    }
}
