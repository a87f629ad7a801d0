use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{sleep_until, timeout, Instant};
use crate::models::PlaceId;
use crate::services::{NearbySearch, PlacesError, PlacesSearch};

/// Pagination limits of the nearby search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaginatorConfig {
    /// Pages fetched at most, the first included
    pub max_pages: usize,
    /// Minimum age of a continuation cursor before it is used
    pub page_delay: Duration,
    /// Upper bound on waiting for and fetching one continuation page
    pub continuation_timeout: Duration,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            max_pages: 3,
            page_delay: Duration::from_millis(1500),
            continuation_timeout: Duration::from_secs(10),
        }
    }
}

/// Place ids gathered by one paginated search
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceIdFetch {
    pub place_ids: Vec<PlaceId>,
    /// False when a continuation timed out and later pages were skipped
    pub complete: bool,
}

/// Drives a nearby search across its pages
///
/// Continuation cursors only become valid some time after they are issued,
/// so each follow-up request waits until `page_delay` has passed since the
/// previous page arrived. A failed page fails the whole fetch; a
/// continuation that does not complete within `continuation_timeout` ends
/// pagination with the ids collected so far.
pub struct PlacesPaginator<'a> {
    places: &'a dyn PlacesSearch,
    config: PaginatorConfig,
}

impl<'a> PlacesPaginator<'a> {
    pub fn new(places: &'a dyn PlacesSearch, config: PaginatorConfig) -> Self {
        Self { places, config }
    }

    /// Deduplicated place ids, in first-seen order
    pub async fn fetch_place_ids(&self, search: &NearbySearch) -> Result<PlaceIdFetch, PlacesError> {
        let mut seen = HashSet::new();
        let mut place_ids = Vec::new();
        let mut complete = true;

        let first = self.places.nearby(search, None).await?;
        let mut issued_at = Instant::now();
        absorb(&mut seen, &mut place_ids, first.place_ids);

        let mut cursor = first.next_page_token;
        let mut pages = 1;

        while let Some(token) = cursor.take() {
            if pages >= self.config.max_pages {
                tracing::debug!("Page cap of {} reached, discarding continuation cursor", self.config.max_pages);
                break;
            }

            let ready_at = issued_at + self.config.page_delay;
            let next = async {
                sleep_until(ready_at).await;
                self.places.nearby(search, Some(&token)).await
            };

            match timeout(self.config.continuation_timeout, next).await {
                Ok(page) => {
                    let page = page?;
                    issued_at = Instant::now();
                    pages += 1;
                    absorb(&mut seen, &mut place_ids, page.place_ids);
                    cursor = page.next_page_token;
                }
                Err(_) => {
                    tracing::warn!(
                        "Continuation page {} timed out after {:?}, returning {} place ids",
                        pages + 1,
                        self.config.continuation_timeout,
                        place_ids.len()
                    );
                    complete = false;
                    break;
                }
            }
        }

        tracing::debug!("Collected {} unique place ids over {} page(s)", place_ids.len(), pages);

        Ok(PlaceIdFetch { place_ids, complete })
    }
}

fn absorb(seen: &mut HashSet<PlaceId>, place_ids: &mut Vec<PlaceId>, page: Vec<PlaceId>) {
    for id in page {
        if seen.insert(id.clone()) {
            place_ids.push(id);
        }
    }
}
