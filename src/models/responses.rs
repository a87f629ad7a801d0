use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::domain::{DishSummary, RestaurantCandidate};

/// Response for the dish discovery endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    #[serde(rename = "dishesInfo")]
    pub dishes_info: Vec<RestaurantView>,
}

/// One restaurant with its surviving dishes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantView {
    pub restaurant_info_id: Uuid,
    pub restaurant_name: String,
    pub location_lat: f64,
    pub location_long: f64,
    pub restaurant_price: i32,
    pub restaurant_rating: f64,
    pub distance_km: f64,
    #[serde(rename = "restaurantDishes")]
    pub restaurant_dishes: Vec<DishView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishView {
    pub restaurant_dish_id: Uuid,
    pub dish_image_url: Option<String>,
    #[serde(rename = "restaurantDishLabels")]
    pub restaurant_dish_labels: Vec<DishLabelView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishLabelView {
    pub dish_label: String,
}

impl RestaurantView {
    pub fn from_candidate(candidate: RestaurantCandidate, distance_km: f64) -> Self {
        let RestaurantCandidate { restaurant, dishes } = candidate;
        Self {
            restaurant_info_id: restaurant.restaurant_info_id,
            restaurant_name: restaurant.name,
            location_lat: restaurant.latitude,
            location_long: restaurant.longitude,
            restaurant_price: restaurant.price,
            restaurant_rating: restaurant.rating,
            distance_km,
            restaurant_dishes: dishes
                .into_iter()
                .map(|dish| DishView {
                    restaurant_dish_id: dish.restaurant_dish_id,
                    dish_image_url: dish.dish_image_url,
                    restaurant_dish_labels: dish
                        .labels
                        .into_iter()
                        .map(|dish_label| DishLabelView { dish_label })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub status_code: u16,
}

/// Record gesture response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordGestureResponse {
    pub message: String,
    pub user_gesture_id: Uuid,
}

/// Result of undoing the latest dislike
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UndoDislikeResponse {
    Restored {
        restaurant_info_id: Uuid,
        restaurant_name: String,
        location_lat: f64,
        location_long: f64,
        restaurant_price: i32,
        #[serde(rename = "restaurantDish")]
        restaurant_dish: UndoneDish,
    },
    Nothing {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoneDish {
    pub restaurant_dish_id: Uuid,
    pub dish_image_url: Option<String>,
}

impl From<DishSummary> for UndoDislikeResponse {
    fn from(summary: DishSummary) -> Self {
        UndoDislikeResponse::Restored {
            restaurant_info_id: summary.restaurant_info_id,
            restaurant_name: summary.restaurant_name,
            location_lat: summary.location_lat,
            location_long: summary.location_long,
            restaurant_price: summary.restaurant_price,
            restaurant_dish: UndoneDish {
                restaurant_dish_id: summary.restaurant_dish_id,
                dish_image_url: summary.dish_image_url,
            },
        }
    }
}

impl UndoDislikeResponse {
    pub fn nothing() -> Self {
        UndoDislikeResponse::Nothing {
            message: "There is nothing to undo".to_string(),
        }
    }
}
