use chrono::{DateTime, Utc};

use crate::models::{Difficulty, RawSubmission, StatsSnapshot};
use crate::stats::difficulty::DifficultyMap;

/// Derives competition stats for `username` from their submission feed.
///
/// Only submissions at or after `cutoff` count. The feed is assumed to be
/// most-recent-first, which only matters for `last_active`.
pub fn compute(
    username: &str,
    submissions: &[RawSubmission],
    difficulties: &DifficultyMap,
    cutoff: DateTime<Utc>,
) -> StatsSnapshot {
    compute_at(username, submissions, difficulties, cutoff, Utc::now())
}

pub(crate) fn compute_at(
    username: &str,
    submissions: &[RawSubmission],
    difficulties: &DifficultyMap,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> StatsSnapshot {
    if submissions.is_empty() {
        log::trace!("[compute] {username} has no recent submissions.");
        return StatsSnapshot::zero(now);
    }

    let cutoff_ms = cutoff.timestamp_millis();
    let since_cutoff = submissions
        .iter()
        .filter(|sub| sub.timestamp_millis() >= cutoff_ms)
        .collect::<Vec<_>>();
    let accepted = since_cutoff
        .iter()
        .filter(|sub| sub.is_accepted())
        .collect::<Vec<_>>();

    let mut snapshot = StatsSnapshot::zero(now);
    for sub in &accepted {
        match difficulties.difficulty_of(&sub.title_slug) {
            Difficulty::Easy => snapshot.easy_since_cutoff += 1,
            Difficulty::Medium => snapshot.medium_since_cutoff += 1,
            Difficulty::Hard => snapshot.hard_since_cutoff += 1,
        }
    }

    snapshot.competition_solves = accepted.len() as u64;
    if !since_cutoff.is_empty() {
        snapshot.acceptance_rate_since_cutoff =
            accepted.len() as f64 / since_cutoff.len() as f64 * 100.0;
    }

    if let Some(latest) = accepted.first() {
        snapshot.last_active = DateTime::from_timestamp_millis(latest.timestamp_millis())
            .unwrap_or(now);
    }

    log::trace!(
        "[compute] {username}: {} solves out of {} submissions since cutoff.",
        accepted.len(), since_cutoff.len()
    );

    snapshot
}
