use crate::models::RestaurantCandidate;

/// Optionally reorder candidates by rating, highest first
///
/// The sort is stable: restaurants with equal ratings keep their relative
/// order. Unrated (NaN) restaurants sort last. Without `sort_by_rating` the
/// input order is returned as is.
pub fn rank(mut candidates: Vec<RestaurantCandidate>, sort_by_rating: bool) -> Vec<RestaurantCandidate> {
    if sort_by_rating {
        candidates.sort_by(|a, b| rating_key(b).total_cmp(&rating_key(a)));
    }
    candidates
}

fn rating_key(candidate: &RestaurantCandidate) -> f64 {
    let rating = candidate.restaurant.rating;
    if rating.is_nan() {
        f64::NEG_INFINITY
    } else {
        rating
    }
}
