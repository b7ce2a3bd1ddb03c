pub mod cache;
pub mod compute;
pub mod difficulty;
pub mod leaderboard;

#[cfg(test)]
pub(crate) mod testing;

use chrono::{DateTime, Utc};

use std::sync::Arc;
use std::time::Duration;

use crate::error::{StatsError, StatsResult};
use crate::lcapi::{ProblemCatalogSource, ProfileSource};
use crate::lcdb::StatsStore;
use crate::models::{Profile, RankedEntry, RankingMode, Scope, StatsSnapshot};

pub use cache::StatsCache;
pub use difficulty::{DifficultyIndex, DifficultyMap};

/// Entry point for everything that wants stats: leaderboards and single
/// users both go through the same cache path.
pub struct StatsService {
    profiles: Arc<dyn ProfileSource>,
    difficulties: DifficultyIndex,
    cache: StatsCache,
    store: Arc<dyn StatsStore>,
    cutoff: DateTime<Utc>,
    fetch_timeout: Duration,
}

impl StatsService {
    pub fn new(
        profiles: Arc<dyn ProfileSource>,
        catalog: Arc<dyn ProblemCatalogSource>,
        store: Arc<dyn StatsStore>,
        cutoff: DateTime<Utc>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            profiles,
            difficulties: DifficultyIndex::new(catalog),
            cache: StatsCache::new(Arc::clone(&store)),
            store,
            cutoff,
            fetch_timeout,
        }
    }

    /// Ranks every user in `scope`. One user's failure never fails the board.
    pub async fn leaderboard(&self, scope: &Scope, mode: RankingMode) -> StatsResult<Vec<RankedEntry>> {
        let users = self.store.list_tracked_users(scope).await?;
        log::trace!("[leaderboard] Ranking {} users ({scope:?}, {mode:?}).", users.len());

        Ok(leaderboard::assemble(&users, mode, |user| {
            self.cache.get_or_refresh(&user.username, || self.refresh(&user.username))
        })
        .await)
    }

    /// Stats for one tracked user, surfacing lookup failures.
    pub async fn user_stats(&self, username: &str) -> StatsResult<StatsSnapshot> {
        self.cache
            .get_or_refresh(username, || async {
                let profile = self.fetch_profile(username).await?;
                if self.store.find_tracked_user(username).await?.is_none() {
                    return Err(StatsError::NotTracked(username.to_string()));
                }
                self.snapshot_of(username, profile).await
            })
            .await
            .inspect_err(|err| log::error!("[user_stats] Could not get stats for {username}: {err}"))
    }

    /// Fetches a LeetCode profile, bounded by the per-user timeout.
    pub async fn fetch_profile(&self, username: &str) -> StatsResult<Profile> {
        tokio::time::timeout(self.fetch_timeout, self.profiles.fetch_profile(username))
            .await
            .map_err(|_| StatsError::SourceUnavailable(format!(
                "Timed out fetching profile for {username}"
            )))?
    }

    /// Fetches the profile and recomputes the snapshot from scratch.
    async fn refresh(&self, username: &str) -> StatsResult<StatsSnapshot> {
        let profile = self.fetch_profile(username).await?;
        self.snapshot_of(username, profile).await
    }

    async fn snapshot_of(&self, username: &str, profile: Profile) -> StatsResult<StatsSnapshot> {
        let difficulties = self.difficulties.resolve().await?;
        let mut snapshot = compute::compute(
            username,
            &profile.recent_submissions,
            &difficulties,
            self.cutoff,
        );
        snapshot.contest_rating = profile.contest_rating;

        Ok(snapshot)
    }
}
