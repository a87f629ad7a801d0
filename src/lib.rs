//! Dish discovery - location-aware restaurant and dish recommendations
//!
//! Given a caller's coordinates and optional preferences, the service pages
//! through a nearby-places search, resolves the results against the local
//! restaurant catalogue, hides dishes the caller keeps disliking and returns
//! the survivors, optionally sorted by rating.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{Discovery, DiscoveryError, DiscoveryResult, DiscoverySettings, ExclusionPolicy, LookupMode};
pub use models::{DiscoveryQuery, DiscoveryResponse, PreferenceCriteria, RestaurantView};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let settings = DiscoverySettings::default();
        assert_eq!(settings.exclusion, ExclusionPolicy::default());
        assert_eq!(settings.lookup, LookupMode::Batch);
    }
}
