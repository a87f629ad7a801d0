// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Dish, DishSummary, GestureStatus, GestureType, LabelPredicate, PlaceId, PreferenceCriteria,
    RestaurantCandidate, RestaurantRecord, StoredPreferences, UserGesture, ValueWindow,
};
pub use requests::{DiscoveryQuery, FieldError, RecordGestureRequest};
pub use responses::{
    DiscoveryResponse, DishView, ErrorResponse, HealthResponse, RecordGestureResponse,
    RestaurantView, UndoDislikeResponse,
};
