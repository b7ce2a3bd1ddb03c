use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Time a cached snapshot stays valid before it is recomputed: 10 minutes.
pub const FRESHNESS_WINDOW_SECS: i64 = 600;

// 2025-06-01T00:00:00Z, used when COMPETITION_START isn't configured.
pub const DEFAULT_COMPETITION_START_MS: i64 = 1_748_736_000_000;

pub const ACCEPTED_STATUS: &str = "Accepted";

/// A LeetCode user registered on the leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedUser {
    pub id: i64,
    pub username: String,
    pub joined_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Parses LeetCode's difficulty labels ("Easy", "MEDIUM", ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Parses the numeric level used by the problem catalog (1, 2 or 3).
    pub fn from_level(level: u64) -> Option<Self> {
        match level {
            1 => Some(Difficulty::Easy),
            2 => Some(Difficulty::Medium),
            3 => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        write!(f, "{label}")
    }
}

/// One entry of a user's recent submission feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSubmission {
    pub title_slug: String,
    pub timestamp_seconds: i64,
    pub status_display: String,
}

impl RawSubmission {
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_seconds.saturating_mul(1000)
    }

    pub fn is_accepted(&self) -> bool {
        self.status_display == ACCEPTED_STATUS
    }
}

/// What the profile source knows about a user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub contest_rating: Option<i64>,
    pub recent_submissions: Vec<RawSubmission>,
}

/// One problem of the global catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProblem {
    pub slug: String,
    pub difficulty: Difficulty,
}

/// Competition-scoped statistics for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub competition_solves: u64,
    pub easy_since_cutoff: u64,
    pub medium_since_cutoff: u64,
    pub hard_since_cutoff: u64,
    pub acceptance_rate_since_cutoff: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_active: DateTime<Utc>,
    pub contest_rating: Option<i64>,
}

impl StatsSnapshot {
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            competition_solves: 0,
            easy_since_cutoff: 0,
            medium_since_cutoff: 0,
            hard_since_cutoff: 0,
            acceptance_rate_since_cutoff: 0.0,
            last_active: now,
            contest_rating: None,
        }
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "**Competition Stats:**\n\
             \tSolves: {}\n\
             \tEasy: {}\n\
             \tMedium: {}\n\
             \tHard: {}\n\
             \tAcceptance Rate: {:.1}%\n\
             \tLast Active: {}\n\
             \tContest Rating: {}",
            self.competition_solves,
            self.easy_since_cutoff,
            self.medium_since_cutoff,
            self.hard_since_cutoff,
            self.acceptance_rate_since_cutoff,
            self.last_active.format("%Y-%m-%d %H:%M UTC"),
            self.contest_rating.map_or_else(|| String::from("unrated"), |r| r.to_string())
        )
    }
}

/// A snapshot as it sits in the stats cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
    pub username: String,
    pub snapshot: StatsSnapshot,
    pub updated_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Whether the entry was written less than `FRESHNESS_WINDOW_SECS` before `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        (now - self.updated_at).num_seconds() < FRESHNESS_WINDOW_SECS
    }
}

/// A row of a leaderboard response. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rank: usize,
    pub id: i64,
    pub username: String,
    pub joined_date: DateTime<Utc>,
    pub snapshot: StatsSnapshot,
}

impl std::fmt::Display for RankedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "`#{:>2}` **{}**: {} solves ({}E/{}M/{}H), {:.1}% accepted",
            self.rank,
            self.username,
            self.snapshot.competition_solves,
            self.snapshot.easy_since_cutoff,
            self.snapshot.medium_since_cutoff,
            self.snapshot.hard_since_cutoff,
            self.snapshot.acceptance_rate_since_cutoff
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RankingMode {
    #[default]
    Competition,
    Accuracy,
}

impl std::str::FromStr for RankingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "competition" => Ok(RankingMode::Competition),
            "accuracy" => Ok(RankingMode::Accuracy),
            other => Err(format!("Unknown ranking mode: {other} (expected competition|accuracy)")),
        }
    }
}

/// Which tracked users a leaderboard covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Room(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn difficulty_labels_and_levels() {
        assert_eq!(Difficulty::from_label("Easy"), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_label("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_label("impossible"), None);
        assert_eq!(Difficulty::from_level(2), Some(Difficulty::Medium));
        assert_eq!(Difficulty::from_level(4), None);
    }

    #[test]
    fn freshness_is_measured_from_updated_at() {
        let now = Utc::now();
        let entry = |age| CachedEntry {
            username: String::from("alice"),
            snapshot: StatsSnapshot::zero(now),
            updated_at: now - TimeDelta::seconds(age),
        };

        assert!(entry(300).is_fresh(now));
        assert!(entry(599).is_fresh(now));
        assert!(!entry(600).is_fresh(now));
        assert!(!entry(700).is_fresh(now));
    }

    #[test]
    fn ranking_mode_parses() {
        assert_eq!("accuracy".parse::<RankingMode>(), Ok(RankingMode::Accuracy));
        assert_eq!("competition".parse::<RankingMode>(), Ok(RankingMode::Competition));
        assert!("speed".parse::<RankingMode>().is_err());
    }

    #[test]
    fn snapshot_round_trips_through_json_with_millisecond_timestamps() {
        let snapshot = StatsSnapshot {
            competition_solves: 3,
            easy_since_cutoff: 1,
            medium_since_cutoff: 1,
            hard_since_cutoff: 1,
            acceptance_rate_since_cutoff: 75.0,
            last_active: DateTime::from_timestamp_millis(1_750_000_000_000).unwrap(),
            contest_rating: Some(1800),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["last_active"], 1_750_000_000_000_i64);
        assert_eq!(serde_json::from_value::<StatsSnapshot>(json).unwrap(), snapshot);
    }
}
