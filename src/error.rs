use thiserror::Error;

/// Failures of the stats pipeline.
///
/// Cloneable so that one failed difficulty-index build can be handed to every
/// caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// LeetCode is unreachable, rate-limiting us, or answered with garbage.
    #[error("LeetCode unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Could not find leetcode user: {0}")]
    UserNotFound(String),

    #[error("User {0} is not being tracked.")]
    NotTracked(String),

    /// Reading or writing the stats cache failed. Never surfaced from the
    /// cache path, only logged.
    #[error("Stats cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Database error: {0}")]
    Persistence(String),
}

impl From<reqwest::Error> for StatsError {
    fn from(err: reqwest::Error) -> Self {
        StatsError::SourceUnavailable(err.to_string())
    }
}

pub type StatsResult<T> = Result<T, StatsError>;
