// Core pipeline exports
pub mod criteria;
pub mod discovery;
pub mod distance;
pub mod exclusion;
pub mod paginator;
pub mod ranking;
pub mod resolver;

pub use criteria::{build_criteria, price_window, radius_meters, rating_window};
pub use discovery::{Discovery, DiscoveryError, DiscoveryResult, DiscoverySettings};
pub use distance::haversine_km;
pub use exclusion::{filter_disliked_dishes, ExclusionPolicy};
pub use paginator::{PaginatorConfig, PlaceIdFetch, PlacesPaginator};
pub use ranking::rank;
pub use resolver::{resolve, LookupMode, LookupModeName};
