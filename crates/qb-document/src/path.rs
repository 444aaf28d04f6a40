//! Document paths for addressing nodes inside a nested document
//!
//! Provides [`DocPath`] for hierarchical addressing of list items, map
//! entries and record fields.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path within a document tree
///
/// Each segment is a record field name, a map key, or a list index written
/// in decimal. Map keys are user-chosen labels, so any character is allowed;
/// the textual form escapes `~` and `/` the way JSON Pointer does.
///
/// # Examples
/// - `["time_investment", "breakdown"]` → `/time_investment/breakdown`
/// - `["process", "2"]` → `/process/2`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath(Vec<String>);

impl DocPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Create path from a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Empty path (document root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Get first segment (if not root)
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Append a list index, returning new path
    #[inline]
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    /// Extend with multiple segments
    #[inline]
    #[must_use]
    pub fn extend(&self, segments: &[impl AsRef<str>]) -> Self {
        let mut new = self.clone();
        for seg in segments {
            new.0.push(seg.as_ref().to_string());
        }
        new
    }

    /// Check if this path is a prefix of another
    ///
    /// # Examples
    /// - `/assessment` is prefix of `/assessment/focus_points`
    /// - `/assessment` is NOT prefix of `/rewards_extended`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Get relative path from ancestor
    ///
    /// # Errors
    /// Returns error if `self` is not a descendant of `ancestor`
    pub fn relative_to(&self, ancestor: &Self) -> Result<Self, PathError> {
        if !ancestor.is_prefix_of(self) {
            return Err(PathError::NotDescendant {
                path: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(Self(self.0[ancestor.0.len()..].to_vec()))
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn escape_segment(segment: &str) -> String {
    if !segment.contains('/') && !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(segment: &str) -> Result<String, PathError> {
    if !segment.contains('~') {
        return Ok(segment.to_string());
    }
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return Err(PathError::InvalidEscape(segment.to_string())),
        }
    }
    Ok(out)
}

impl Display for DocPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for seg in &self.0 {
            write!(f, "/{}", escape_segment(seg))?;
        }
        Ok(())
    }
}

impl FromStr for DocPath {
    type Err = PathError;

    /// Parse a pointer-style path. The leading `/` is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let body = s.strip_prefix('/').unwrap_or(s);
        let segments = body
            .split('/')
            .map(unescape_segment)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }
}

impl From<Vec<String>> for DocPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for DocPath {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_string()).collect())
    }
}

impl Default for DocPath {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to document paths
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    /// `~` not followed by `0` or `1`
    #[error("invalid escape sequence in segment: {0}")]
    InvalidEscape(String),

    /// Not a descendant path
    #[error("path '{path}' is not a descendant of '{ancestor}'")]
    NotDescendant { path: String, ancestor: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_new_and_segments() {
        let path = DocPath::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(path.segments(), &["a", "b"]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn path_root() {
        let path = DocPath::root();
        assert!(path.is_empty());
        assert!(path.parent().is_none());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn path_parent_and_last() {
        let path: DocPath = "/time_investment/totals/frontend".parse().unwrap();
        assert_eq!(path.last(), Some("frontend"));
        assert_eq!(path.first(), Some("time_investment"));
        assert_eq!(path.parent().unwrap().to_string(), "/time_investment/totals");
    }

    #[test]
    fn path_child_and_index() {
        let base = DocPath::single("process");
        assert_eq!(base.index(3).segments(), &["process", "3"]);
        assert_eq!(base.child("x").segments(), &["process", "x"]);
    }

    #[test]
    fn path_prefix() {
        let a: DocPath = "a/b".parse().unwrap();
        let b: DocPath = "a/b/c".parse().unwrap();
        assert!(a.is_prefix_of(&b));
        assert!(!b.is_prefix_of(&a));
        assert!(a.is_prefix_of(&a));
    }

    #[test]
    fn path_relative_to() {
        let full: DocPath = "/a/b/c".parse().unwrap();
        let anc: DocPath = "/a".parse().unwrap();
        assert_eq!(full.relative_to(&anc).unwrap().segments(), &["b", "c"]);
        let other: DocPath = "/x".parse().unwrap();
        assert!(matches!(
            full.relative_to(&other),
            Err(PathError::NotDescendant { .. })
        ));
    }

    #[test]
    fn path_keys_with_separators_survive_display() {
        let path = DocPath::new(vec!["totals".into(), "design/ux ~ qa".into()]);
        let shown = path.to_string();
        assert_eq!(shown, "/totals/design~1ux ~0 qa");
        let parsed: DocPath = shown.parse().unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn path_keys_with_dots_and_spaces_are_single_segments() {
        let path: DocPath = "/breakdown/v1.2 research".parse().unwrap();
        assert_eq!(path.segments(), &["breakdown", "v1.2 research"]);
    }

    #[test]
    fn path_invalid_escape() {
        let result: Result<DocPath, _> = "/a~2".parse();
        assert!(matches!(result, Err(PathError::InvalidEscape(_))));
    }
}
