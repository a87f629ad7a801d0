use geo::{HaversineDistance, Point};

/// Great-circle distance between two coordinates in kilometers
#[inline]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let from = Point::new(lon1, lat1);
    let to = Point::new(lon2, lat2);
    from.haversine_distance(&to) / 1000.0
}

/// Distance rounded to meters, as reported to clients
pub fn display_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    (haversine_km(lat1, lon1, lat2, lon2) * 1000.0).round() / 1000.0
}
