pub mod client;

use serenity::async_trait;

use crate::error::StatsResult;
use crate::models::{CatalogProblem, Profile};

pub use client::LeetCodeClient;

/// Where a user's recent submissions come from.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetches the contest rating and recent submission feed for `username`.
    ///
    /// Fails with `UserNotFound` if the platform has no such user.
    async fn fetch_profile(&self, username: &str) -> StatsResult<Profile>;
}

/// Where the global problem list (slug and difficulty) comes from.
#[async_trait]
pub trait ProblemCatalogSource: Send + Sync {
    async fn fetch_all_problems(&self) -> StatsResult<Vec<CatalogProblem>>;
}
