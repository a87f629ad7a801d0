// Service exports
pub mod auth;
pub mod cache;
pub mod memory;
pub mod places;
pub mod postgres;
pub mod store;

pub use auth::{AuthError, Claims, TokenVerifier};
pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use memory::{LookupCounts, MemoryStore, ScriptedPlaces};
pub use places::{GooglePlacesClient, NearbySearch, PlacesError, PlacesPage, PlacesSearch};
pub use postgres::PostgresStore;
pub use store::{DiscoveryStore, StoreError};
