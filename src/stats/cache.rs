use chrono::Utc;

use std::future::Future;
use std::sync::Arc;

use crate::error::StatsResult;
use crate::lcdb::StatsStore;
use crate::models::{CachedEntry, StatsSnapshot};

/// Per-username snapshot cache with a fixed freshness window.
///
/// Concurrent refreshes of the same username are not coalesced; the last
/// upsert wins.
#[derive(Clone)]
pub struct StatsCache {
    store: Arc<dyn StatsStore>,
}

impl StatsCache {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self { store }
    }

    /// Returns the cached snapshot for `username` if it is still fresh,
    /// otherwise runs `refresh` and stores its result.
    ///
    /// An error from `refresh` is returned as-is and leaves any stale entry
    /// in place. Store failures are logged and treated as a miss.
    pub async fn get_or_refresh<F, Fut>(&self, username: &str, refresh: F) -> StatsResult<StatsSnapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StatsResult<StatsSnapshot>>,
    {
        self.get_or_refresh_entry(username, refresh)
            .await
            .map(|entry| entry.snapshot)
    }

    pub async fn get_or_refresh_entry<F, Fut>(&self, username: &str, refresh: F) -> StatsResult<CachedEntry>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StatsResult<StatsSnapshot>>,
    {
        match self.store.find_cached_entry(username).await {
            Ok(Some(entry)) if entry.is_fresh(Utc::now()) => {
                log::trace!("[get_or_refresh] Cache hit for {username}.");
                return Ok(entry);
            }
            Ok(Some(_)) => log::trace!("[get_or_refresh] Cached stats for {username} are stale."),
            Ok(None) => log::trace!("[get_or_refresh] No cached stats for {username}."),
            Err(err) => log::warn!("[get_or_refresh] Treating cache read as a miss: {err}"),
        }

        let snapshot = refresh().await?;
        let entry = CachedEntry {
            username: username.to_string(),
            snapshot,
            updated_at: Utc::now(),
        };

        if let Err(err) = self.store.upsert_cached_entry(&entry).await {
            log::warn!("[get_or_refresh] Could not cache stats for {username}: {err}");
        }

        Ok(entry)
    }
}
