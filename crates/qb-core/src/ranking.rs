//! Ranking board
//!
//! Users ordered by the number of levels they completed.

use crate::error::CoreResult;
use qb_store::{Filter, Profile, RemoteStore, Repository, UserProgress};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Trophy shown next to the top three
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trophy {
    Gold,
    Silver,
    Bronze,
}

impl Trophy {
    /// Trophy for a 1-based rank
    #[must_use]
    pub fn for_rank(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(Self::Gold),
            2 => Some(Self::Silver),
            3 => Some(Self::Bronze),
            _ => None,
        }
    }
}

impl fmt::Display for Trophy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gold => "gold",
            Self::Silver => "silver",
            Self::Bronze => "bronze",
        })
    }
}

/// One row of the board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    /// 1-based position
    pub rank: usize,
    pub profile: Profile,
    pub completed_levels: usize,
    pub trophy: Option<Trophy>,
    /// Share of the leader's count, in `0.0..=1.0`
    pub bar_ratio: f64,
}

/// Build the board from profiles and completions
///
/// Ties keep a stable order by name, then id; each entry still gets its own
/// position.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rank_users(profiles: Vec<Profile>, progress: &[UserProgress]) -> Vec<RankingEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for p in progress {
        *counts.entry(p.user_id.as_str()).or_default() += 1;
    }
    let mut rows: Vec<(usize, Profile)> = profiles
        .into_iter()
        .map(|p| (counts.get(p.id.as_str()).copied().unwrap_or(0), p))
        .collect();
    rows.sort_by(|(a, pa), (b, pb)| {
        b.cmp(a)
            .then_with(|| pa.full_name.cmp(&pb.full_name))
            .then_with(|| pa.id.cmp(&pb.id))
    });
    let max = rows.first().map_or(0, |(n, _)| *n);

    rows.into_iter()
        .enumerate()
        .map(|(i, (completed_levels, profile))| RankingEntry {
            rank: i + 1,
            trophy: Trophy::for_rank(i + 1),
            bar_ratio: if max == 0 {
                0.0
            } else {
                completed_levels as f64 / max as f64
            },
            completed_levels,
            profile,
        })
        .collect()
}

/// Load and build the board
///
/// # Errors
/// [`CoreError::Store`](crate::CoreError::Store) if a table cannot be read.
pub async fn ranking(store: &Arc<dyn RemoteStore>) -> CoreResult<Vec<RankingEntry>> {
    let profiles = Repository::<Profile>::new(Arc::clone(store)).list(&Filter::all()).await?;
    let progress = Repository::<UserProgress>::new(Arc::clone(store))
        .list(&Filter::all())
        .await?;
    Ok(rank_users(profiles, &progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(id: &str, name: &str) -> Profile {
        Profile {
            id: id.into(),
            full_name: name.into(),
            avatar_url: None,
            created_at: None,
        }
    }

    fn done(user: &str, level: &str) -> UserProgress {
        UserProgress {
            id: format!("{user}-{level}"),
            user_id: user.into(),
            level_id: level.into(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn orders_by_count_with_trophies() {
        let profiles = vec![
            profile("a", "Ann"),
            profile("b", "Bob"),
            profile("c", "Cat"),
            profile("d", "Dan"),
        ];
        let progress = vec![
            done("b", "1"),
            done("b", "2"),
            done("b", "3"),
            done("b", "4"),
            done("c", "1"),
            done("a", "1"),
            done("a", "2"),
        ];
        let board = rank_users(profiles, &progress);
        let view: Vec<_> = board
            .iter()
            .map(|e| (e.rank, e.profile.id.as_str(), e.completed_levels, e.trophy))
            .collect();
        assert_eq!(
            view,
            vec![
                (1, "b", 4, Some(Trophy::Gold)),
                (2, "a", 2, Some(Trophy::Silver)),
                (3, "c", 1, Some(Trophy::Bronze)),
                (4, "d", 0, None),
            ]
        );
        assert!((board[1].bar_ratio - 0.5).abs() < f64::EPSILON);
        assert!((board[0].bar_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nobody_completed_anything() {
        let board = rank_users(vec![profile("a", "Ann")], &[]);
        assert_eq!(board[0].completed_levels, 0);
        assert!(board[0].bar_ratio.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn loads_from_store() {
        let store: Arc<dyn RemoteStore> = qb_test_utils::sample_store();
        let board = ranking(&store).await.unwrap();
        let ids: Vec<_> = board.iter().map(|e| e.profile.id.as_str()).collect();
        assert_eq!(ids, vec!["u-ann", "u-bob", "u-cat"]);
    }
}
