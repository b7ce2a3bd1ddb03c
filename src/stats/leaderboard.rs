use chrono::Utc;
use futures::future::join_all;

use std::future::Future;

use crate::error::StatsResult;
use crate::models::{RankedEntry, RankingMode, StatsSnapshot, TrackedUser};

/// Fetches a snapshot for every user concurrently and ranks them.
///
/// A user whose snapshot can't be obtained is ranked with zero stats rather
/// than dropped, so the output always has one entry per input user.
pub async fn assemble<'a, F, Fut>(
    users: &'a [TrackedUser],
    mode: RankingMode,
    fetch: F,
) -> Vec<RankedEntry>
where
    F: Fn(&'a TrackedUser) -> Fut,
    Fut: Future<Output = StatsResult<StatsSnapshot>>,
{
    let snapshots = join_all(users.iter().map(&fetch)).await;

    let entries = users
        .iter()
        .zip(snapshots)
        .map(|(user, snapshot)| {
            let snapshot = snapshot.unwrap_or_else(|err| {
                log::warn!("[assemble] Ranking {} with zero stats: {err}", user.username);
                StatsSnapshot::zero(Utc::now())
            });
            (user, snapshot)
        })
        .collect::<Vec<_>>();

    rank(entries, mode)
}

/// Stable descending sort by the mode's key, then 1-based dense ranks.
///
/// Ties keep their input order; there is no secondary key.
pub fn rank(mut entries: Vec<(&TrackedUser, StatsSnapshot)>, mode: RankingMode) -> Vec<RankedEntry> {
    match mode {
        RankingMode::Competition => entries.sort_by(|(_, a), (_, b)| {
            b.competition_solves.cmp(&a.competition_solves)
        }),
        RankingMode::Accuracy => entries.sort_by(|(_, a), (_, b)| {
            b.acceptance_rate_since_cutoff.total_cmp(&a.acceptance_rate_since_cutoff)
        }),
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(index, (user, snapshot))| RankedEntry {
            rank: index + 1,
            id: user.id,
            username: user.username.clone(),
            joined_date: user.joined_date,
            snapshot,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsError;

    use std::collections::HashMap;

    fn users(names: &[&str]) -> Vec<TrackedUser> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| TrackedUser {
                id: i as i64 + 1,
                username: name.to_string(),
                joined_date: Utc::now(),
            })
            .collect()
    }

    fn snapshot(solves: u64, rate: f64) -> StatsSnapshot {
        StatsSnapshot {
            competition_solves: solves,
            medium_since_cutoff: solves,
            acceptance_rate_since_cutoff: rate,
            ..StatsSnapshot::zero(Utc::now())
        }
    }

    async fn run(
        users: &[TrackedUser],
        mode: RankingMode,
        stats: &HashMap<&str, StatsResult<StatsSnapshot>>,
    ) -> Vec<RankedEntry> {
        assemble(users, mode, |user| async move {
            stats[user.username.as_str()].clone()
        })
        .await
    }

    fn order(entries: &[RankedEntry]) -> Vec<(&str, usize)> {
        entries.iter().map(|e| (e.username.as_str(), e.rank)).collect()
    }

    #[tokio::test]
    async fn ties_keep_input_order() {
        let users = users(&["A", "B", "C"]);
        let stats = HashMap::from([
            ("A", Ok(snapshot(5, 50.0))),
            ("B", Ok(snapshot(12, 40.0))),
            ("C", Ok(snapshot(12, 90.0))),
        ]);

        let board = run(&users, RankingMode::Competition, &stats).await;

        assert_eq!(order(&board), vec![("B", 1), ("C", 2), ("A", 3)]);
    }

    #[tokio::test]
    async fn accuracy_mode_sorts_by_acceptance_rate() {
        let users = users(&["A", "B", "C"]);
        let stats = HashMap::from([
            ("A", Ok(snapshot(5, 50.0))),
            ("B", Ok(snapshot(12, 40.0))),
            ("C", Ok(snapshot(12, 90.0))),
        ]);

        let board = run(&users, RankingMode::Accuracy, &stats).await;

        assert_eq!(order(&board), vec![("C", 1), ("A", 2), ("B", 3)]);
    }

    #[tokio::test]
    async fn failed_user_is_ranked_with_zero_stats() {
        let users = users(&["A", "B", "C"]);
        let stats = HashMap::from([
            ("A", Ok(snapshot(5, 50.0))),
            ("B", Ok(snapshot(12, 40.0))),
            ("C", Err(StatsError::SourceUnavailable(String::from("timed out")))),
        ]);

        let board = run(&users, RankingMode::Competition, &stats).await;

        assert_eq!(board.len(), 3);
        assert_eq!(order(&board), vec![("B", 1), ("A", 2), ("C", 3)]);
        assert_eq!(board[2].snapshot.competition_solves, 0);
        assert_eq!(board[2].snapshot.acceptance_rate_since_cutoff, 0.0);
    }

    #[tokio::test]
    async fn all_zero_board_is_input_order() {
        let users = users(&["D", "C", "B", "A"]);
        let stats = users
            .iter()
            .map(|u| (u.username.as_str(), Err(StatsError::UserNotFound(u.username.clone()))))
            .collect::<HashMap<_, _>>();

        let board = run(&users, RankingMode::Accuracy, &stats).await;

        assert_eq!(order(&board), vec![("D", 1), ("C", 2), ("B", 3), ("A", 4)]);
    }

    #[tokio::test]
    async fn empty_user_list_gives_empty_board() {
        let board = run(&[], RankingMode::Competition, &HashMap::new()).await;
        assert!(board.is_empty());
    }

    #[test]
    fn ranks_carry_user_fields() {
        let users = users(&["alice"]);
        let board = rank(vec![(&users[0], snapshot(3, 75.0))], RankingMode::Competition);

        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].id, users[0].id);
        assert_eq!(board[0].joined_date, users[0].joined_date);
        assert_eq!(board[0].snapshot.competition_solves, 3);
    }
}
