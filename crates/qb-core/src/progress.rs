//! Per-user progress grouped by section and path

use crate::error::CoreResult;
use crate::hierarchy::Hierarchy;
use qb_store::{Filter, RemoteStore, Repository, UserProgress};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Progress through one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathProgress {
    pub path_id: String,
    pub path_title: String,
    pub completed: usize,
    pub total: usize,
    /// `round(completed / total * 100)`
    pub percent: u32,
    /// Title of the most recently completed level
    pub current_level: Option<String>,
}

/// Paths of one section the user has started
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionProgress {
    pub section_id: String,
    pub section_title: String,
    pub paths: Vec<PathProgress>,
}

/// Rounded completion percentage; zero for an empty path
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u32
}

pub(crate) fn group(hierarchy: &Hierarchy, progress: &[UserProgress]) -> Vec<SectionProgress> {
    let totals = hierarchy.level_counts();

    // (section order, section id) -> (path order, path id) -> completions
    let mut tree: BTreeMap<(i64, &str), BTreeMap<(i64, &str), Vec<&UserProgress>>> = BTreeMap::new();
    for p in progress {
        let Some(level) = hierarchy.levels.get(&p.level_id) else {
            tracing::debug!(level_id = %p.level_id, "completion of unknown level skipped");
            continue;
        };
        let Some(path) = hierarchy.path_of(level) else { continue };
        let Some(section) = hierarchy.section_of(path) else { continue };
        tree.entry((section.order, section.id.as_str()))
            .or_default()
            .entry((path.order, path.id.as_str()))
            .or_default()
            .push(p);
    }

    tree.into_iter()
        .map(|((_, section_id), paths)| SectionProgress {
            section_id: section_id.to_string(),
            section_title: hierarchy.sections.get(section_id).map(|s| s.title.clone()).unwrap_or_default(),
            paths: paths
                .into_iter()
                .map(|((_, path_id), done)| {
                    let total = totals.get(path_id).copied().unwrap_or(0);
                    let latest = done.iter().max_by(|a, b| {
                        a.completed_at.cmp(&b.completed_at).then_with(|| a.id.cmp(&b.id))
                    });
                    PathProgress {
                        path_id: path_id.to_string(),
                        path_title: hierarchy.paths.get(path_id).map(|p| p.title.clone()).unwrap_or_default(),
                        completed: done.len(),
                        total,
                        percent: percent(done.len(), total),
                        current_level: latest
                            .and_then(|p| hierarchy.levels.get(&p.level_id))
                            .map(|l| l.title.clone()),
                    }
                })
                .collect(),
        })
        .collect()
}

/// Load a user's progress
///
/// Only sections and paths with at least one completion appear.
///
/// # Errors
/// [`CoreError::Store`](crate::CoreError::Store) if a table cannot be read.
pub async fn user_progress(store: &Arc<dyn RemoteStore>, user_id: &str) -> CoreResult<Vec<SectionProgress>> {
    let progress = Repository::<UserProgress>::new(Arc::clone(store))
        .list(&Filter::all().eq("user_id", user_id))
        .await?;
    let hierarchy = Hierarchy::load(store).await?;
    Ok(group(&hierarchy, &progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use qb_test_utils::sample_store;

    #[test]
    fn percent_rounds() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 0);
    }

    #[tokio::test]
    async fn grouped_by_section_then_path() {
        let store: Arc<dyn RemoteStore> = sample_store();
        let sections = user_progress(&store, "u-ann").await.unwrap();
        assert_eq!(
            sections,
            vec![
                SectionProgress {
                    section_id: "s-dev".into(),
                    section_title: "Development".into(),
                    paths: vec![PathProgress {
                        path_id: "p-rust".into(),
                        path_title: "Rust".into(),
                        completed: 2,
                        total: 3,
                        percent: 67,
                        current_level: Some("Traits".into()),
                    }],
                },
                SectionProgress {
                    section_id: "s-ops".into(),
                    section_title: "Operations".into(),
                    paths: vec![PathProgress {
                        path_id: "p-k8s".into(),
                        path_title: "Kubernetes".into(),
                        completed: 1,
                        total: 1,
                        percent: 100,
                        current_level: Some("Pods".into()),
                    }],
                },
            ]
        );
    }

    #[tokio::test]
    async fn no_completions_no_sections() {
        let store: Arc<dyn RemoteStore> = sample_store();
        assert!(user_progress(&store, "u-cat").await.unwrap().is_empty());
    }
}
