//! Sections, paths and levels loaded together for joined views

use crate::error::CoreResult;
use qb_store::{Filter, LearningPath, Level, RemoteStore, Repository, Section};
use std::collections::HashMap;
use std::sync::Arc;

/// Whole content hierarchy indexed by id
#[derive(Debug, Clone, Default)]
pub(crate) struct Hierarchy {
    pub(crate) sections: HashMap<String, Section>,
    pub(crate) paths: HashMap<String, LearningPath>,
    pub(crate) levels: HashMap<String, Level>,
}

impl Hierarchy {
    pub(crate) async fn load(store: &Arc<dyn RemoteStore>) -> CoreResult<Self> {
        let all = Filter::all();
        let sections = Repository::<Section>::new(Arc::clone(store)).list(&all).await?;
        let paths = Repository::<LearningPath>::new(Arc::clone(store)).list(&all).await?;
        let levels = Repository::<Level>::new(Arc::clone(store)).list(&all).await?;
        Ok(Self {
            sections: sections.into_iter().map(|s| (s.id.clone(), s)).collect(),
            paths: paths.into_iter().map(|p| (p.id.clone(), p)).collect(),
            levels: levels.into_iter().map(|l| (l.id.clone(), l)).collect(),
        })
    }

    pub(crate) fn path_of(&self, level: &Level) -> Option<&LearningPath> {
        self.paths.get(&level.path_id)
    }

    pub(crate) fn section_of(&self, path: &LearningPath) -> Option<&Section> {
        self.sections.get(&path.section_id)
    }

    /// Level, path and section titles; blank where a row is missing
    pub(crate) fn titles(&self, level_id: &str) -> (String, String, String) {
        let level = self.levels.get(level_id);
        let path = level.and_then(|l| self.path_of(l));
        let section = path.and_then(|p| self.section_of(p));
        (
            level.map(|l| l.title.clone()).unwrap_or_default(),
            path.map(|p| p.title.clone()).unwrap_or_default(),
            section.map(|s| s.title.clone()).unwrap_or_default(),
        )
    }

    /// `(section order, path order, rank)`
    pub(crate) fn sort_key(&self, level: &Level) -> (i64, i64, i64) {
        let path = self.path_of(level);
        let section = path.and_then(|p| self.section_of(p));
        (
            section.map_or(i64::MAX, |s| s.order),
            path.map_or(i64::MAX, |p| p.order),
            level.rank,
        )
    }

    /// Number of levels in each path
    pub(crate) fn level_counts(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for level in self.levels.values() {
            *counts.entry(level.path_id.as_str()).or_default() += 1;
        }
        counts
    }
}
