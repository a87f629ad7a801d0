use chrono::{DateTime, Days, NaiveDate, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use std::collections::HashMap;
use uuid::Uuid;
use crate::core::resolver::LookupMode;
use crate::models::RestaurantCandidate;
use crate::services::{DiscoveryStore, StoreError};

/// Cooldown and frequency rule applied to a user's dislikes of a dish
///
/// A dish is hidden when it was disliked within the last `cooldown_days`
/// calendar days (today counts as the first), or when it was disliked at
/// least `threshold` times within the trailing `window_days`. Days are UTC
/// calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionPolicy {
    pub cooldown_days: u32,
    pub window_days: u32,
    pub threshold: usize,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            cooldown_days: 2,
            window_days: 30,
            threshold: 5,
        }
    }
}

impl ExclusionPolicy {
    pub fn is_excluded(&self, dislikes: &[DateTime<Utc>], today: NaiveDate) -> bool {
        if dislikes.is_empty() {
            return false;
        }

        let cooldown_start = self
            .cooldown_days
            .checked_sub(1)
            .map(|back| days_before(today, back));
        let window_start = days_before(today, self.window_days);

        let mut in_window = 0;
        for day in dislikes.iter().map(|ts| ts.date_naive()) {
            if day > today {
                continue;
            }
            if cooldown_start.is_some_and(|start| day >= start) {
                return true;
            }
            if day >= window_start {
                in_window += 1;
            }
        }

        in_window >= self.threshold
    }
}

/// Spans reaching past the calendar's start saturate at its first day
fn days_before(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Remove dishes the user recently or repeatedly disliked
///
/// Anonymous callers get the candidates back untouched. A restaurant whose
/// dishes are all removed stays in the list with no dishes.
pub async fn filter_disliked_dishes(
    store: &dyn DiscoveryStore,
    candidates: Vec<RestaurantCandidate>,
    user_id: Option<Uuid>,
    policy: &ExclusionPolicy,
    mode: LookupMode,
    today: NaiveDate,
) -> Result<Vec<RestaurantCandidate>, StoreError> {
    let Some(user_id) = user_id else {
        return Ok(candidates);
    };

    let mut dish_ids: Vec<Uuid> = candidates
        .iter()
        .flat_map(|c| c.dishes.iter().map(|d| d.restaurant_dish_id))
        .collect();
    dish_ids.sort_unstable();
    dish_ids.dedup();

    if dish_ids.is_empty() {
        return Ok(candidates);
    }

    let histories = dislike_histories(store, user_id, &dish_ids, mode).await?;

    let filtered: Vec<RestaurantCandidate> = candidates
        .into_iter()
        .map(|candidate| RestaurantCandidate {
            dishes: candidate
                .dishes
                .into_iter()
                .filter(|dish| {
                    let history = histories
                        .get(&dish.restaurant_dish_id)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    !policy.is_excluded(history, today)
                })
                .collect(),
            restaurant: candidate.restaurant,
        })
        .collect();

    let kept: usize = filtered.iter().map(|c| c.dishes.len()).sum();
    tracing::debug!("Dislike filter kept {} of {} dishes for user {}", kept, dish_ids.len(), user_id);

    Ok(filtered)
}

async fn dislike_histories(
    store: &dyn DiscoveryStore,
    user_id: Uuid,
    dish_ids: &[Uuid],
    mode: LookupMode,
) -> Result<HashMap<Uuid, Vec<DateTime<Utc>>>, StoreError> {
    match mode {
        LookupMode::Sequential => {
            let mut histories = HashMap::with_capacity(dish_ids.len());
            for id in dish_ids {
                histories.insert(*id, store.dislike_history(user_id, *id).await?);
            }
            Ok(histories)
        }
        LookupMode::Concurrent { limit } => {
            stream::iter(dish_ids.iter().copied())
                .map(|id| async move { Ok::<_, StoreError>((id, store.dislike_history(user_id, id).await?)) })
                .buffer_unordered(limit.max(1))
                .try_collect()
                .await
        }
        LookupMode::Batch => store.dislike_histories(user_id, dish_ids).await,
    }
}
