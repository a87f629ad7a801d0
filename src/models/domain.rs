use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque place identifier issued by the places search service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(pub String);

impl PlaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlaceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Locally stored restaurant, keyed by its place identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub restaurant_info_id: Uuid,
    pub place_id: PlaceId,
    #[serde(rename = "restaurant_name")]
    pub name: String,
    #[serde(rename = "location_lat")]
    pub latitude: f64,
    #[serde(rename = "location_long")]
    pub longitude: f64,
    #[serde(rename = "restaurant_price")]
    pub price: i32,
    #[serde(rename = "restaurant_rating")]
    pub rating: f64,
    #[serde(rename = "restaurant_address", default)]
    pub address: Option<String>,
    #[serde(rename = "restaurant_contact_no", default)]
    pub contact_no: Option<String>,
}

/// A dish photographed at a restaurant, tagged with free-text labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub restaurant_dish_id: Uuid,
    pub restaurant_info_id: Uuid,
    #[serde(default)]
    pub dish_image_url: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// A restaurant together with the dishes that survived filtering
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantCandidate {
    pub restaurant: RestaurantRecord,
    pub dishes: Vec<Dish>,
}

/// Inclusive numeric window used for price and rating filters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueWindow {
    pub min: f64,
    pub max: f64,
}

impl ValueWindow {
    /// Window used when the caller expressed no preference
    pub const OPEN: ValueWindow = ValueWindow { min: 0.0, max: 5.0 };

    pub fn around(center: f64, tolerance: f64) -> Self {
        Self {
            min: center - tolerance,
            max: center + tolerance,
        }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Accepted dish labels, OR-combined, matched as substrings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelPredicate {
    /// No cuisine or food type selected: every dish matches
    Any,
    OneOf(Vec<String>),
}

impl LabelPredicate {
    pub fn from_labels(labels: Vec<String>) -> Self {
        if labels.is_empty() {
            LabelPredicate::Any
        } else {
            LabelPredicate::OneOf(labels)
        }
    }

    #[inline]
    pub fn matches_label(&self, dish_label: &str) -> bool {
        match self {
            LabelPredicate::Any => true,
            LabelPredicate::OneOf(accepted) => accepted.iter().any(|a| dish_label.contains(a.as_str())),
        }
    }

    /// A dish matches when any of its labels matches
    pub fn matches_dish(&self, dish: &Dish) -> bool {
        match self {
            LabelPredicate::Any => true,
            LabelPredicate::OneOf(_) => dish.labels.iter().any(|l| self.matches_label(l)),
        }
    }

    /// Patterns suitable for `LIKE ANY(...)`; `None` means unconstrained
    pub fn like_patterns(&self) -> Option<Vec<String>> {
        match self {
            LabelPredicate::Any => None,
            LabelPredicate::OneOf(accepted) => Some(
                accepted
                    .iter()
                    .map(|a| format!("%{}%", escape_like(a)))
                    .collect(),
            ),
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Normalized description of the caller's discovery filters
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceCriteria {
    pub price_window: ValueWindow,
    pub rating_window: ValueWindow,
    pub label_predicate: LabelPredicate,
    pub sort_by_rating: bool,
    pub sort_by_distance: bool,
    pub radius_meters: u32,
}

impl PreferenceCriteria {
    /// Whether a restaurant falls inside both the price and rating windows
    #[inline]
    pub fn admits(&self, restaurant: &RestaurantRecord) -> bool {
        self.price_window.contains(restaurant.price as f64)
            && self.rating_window.contains(restaurant.rating)
    }
}

/// Stored per-user discovery preferences, as persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredPreferences {
    pub restaurant_rating: Option<i32>,
    /// Persisted as text
    pub restaurant_price: Option<String>,
    /// Miles
    pub restaurant_distance: Option<i32>,
    pub sort_by_distance: Option<bool>,
    pub sort_by_rating: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureType {
    Like,
    Dislike,
    Wishlist,
}

impl GestureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureType::Like => "like",
            GestureType::Dislike => "dislike",
            GestureType::Wishlist => "wishlist",
        }
    }
}

impl FromStr for GestureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(GestureType::Like),
            "dislike" => Ok(GestureType::Dislike),
            "wishlist" => Ok(GestureType::Wishlist),
            other => Err(format!("unknown gesture type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureStatus {
    Active,
    Deleted,
}

impl GestureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureStatus::Active => "active",
            GestureStatus::Deleted => "deleted",
        }
    }
}

/// A user's reaction to a dish photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGesture {
    pub user_gesture_id: Uuid,
    pub user_id: Uuid,
    pub restaurant_dish_id: Uuid,
    pub gesture_type: GestureType,
    pub status: GestureStatus,
    pub created_at: DateTime<Utc>,
}

/// Restaurant and dish a gesture pointed at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishSummary {
    pub restaurant_info_id: Uuid,
    pub restaurant_name: String,
    pub location_lat: f64,
    pub location_long: f64,
    pub restaurant_price: i32,
    pub restaurant_dish_id: Uuid,
    pub dish_image_url: Option<String>,
}
