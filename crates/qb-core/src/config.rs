//! Questboard configuration
//!
//! Loaded from TOML; every field has a default so a partial file works.
//!
//! ```toml
//! admin_secret_sha256 = "5e88...42d8"
//! activity_limit = 5
//!
//! [editor]
//! debounce = 3000
//! debounced_fields = ["time_investment"]
//! rename_policy = "reject"
//!
//! [cache]
//! capacity = 1000
//! ttl_secs = 300
//! ```

use crate::error::{CoreError, CoreResult};
use qb_document::RenameCollisionPolicy;
use qb_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Query cache sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached query results
    pub capacity: u64,
    /// Seconds before a cached result expires regardless of invalidation
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// Time to live
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000,
            ttl_secs: 300,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestboardConfig {
    /// Admin secret in clear text
    pub admin_secret: Option<String>,
    /// SHA-256 of the admin secret, hex encoded; wins over `admin_secret`
    pub admin_secret_sha256: Option<String>,
    /// Nested editor behaviour
    pub editor: EditorConfig,
    /// Query cache sizing
    pub cache: CacheConfig,
    /// Entries shown in the activity feed
    pub activity_limit: usize,
}

impl Default for QuestboardConfig {
    fn default() -> Self {
        Self {
            admin_secret: None,
            admin_secret_sha256: None,
            editor: EditorConfig::default(),
            cache: CacheConfig::default(),
            activity_limit: 5,
        }
    }
}

impl QuestboardConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// [`CoreError::Config`] on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// [`CoreError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`CoreError::Config`] naming the first bad value.
    pub fn validate(&self) -> CoreResult<()> {
        if self.activity_limit == 0 {
            return Err(CoreError::Config("activity_limit must be at least 1".into()));
        }
        if self.cache.capacity == 0 {
            return Err(CoreError::Config("cache.capacity must be at least 1".into()));
        }
        if self.editor.debounce.is_zero() {
            return Err(CoreError::Config("editor.debounce must be positive".into()));
        }
        if let Some(digest) = &self.admin_secret_sha256 {
            if digest.len() != 64 || hex::decode(digest).is_err() {
                return Err(CoreError::Config("admin_secret_sha256 must be 64 hex characters".into()));
            }
        }
        Ok(())
    }

    /// With clear-text admin secret
    #[inline]
    #[must_use]
    pub fn with_admin_secret(mut self, secret: impl Into<String>) -> Self {
        self.admin_secret = Some(secret.into());
        self
    }

    /// With debounce quiet period
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, quiet: Duration) -> Self {
        self.editor.debounce = quiet;
        self
    }

    /// With rename collision policy
    #[inline]
    #[must_use]
    pub fn with_rename_policy(mut self, policy: RenameCollisionPolicy) -> Self {
        self.editor.rename_policy = policy;
        self
    }

    /// With cache sizing
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, capacity: u64, ttl: Duration) -> Self {
        self.cache = CacheConfig {
            capacity,
            ttl_secs: ttl.as_secs(),
        };
        self
    }

    /// With activity feed length
    #[inline]
    #[must_use]
    pub fn with_activity_limit(mut self, limit: usize) -> Self {
        self.activity_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = QuestboardConfig::from_toml_str(
            r#"
            activity_limit = 10

            [editor]
            debounce = 500
            rename_policy = "overwrite"
            "#,
        )
        .unwrap();
        assert_eq!(config.activity_limit, 10);
        assert_eq!(config.editor.debounce, Duration::from_millis(500));
        assert_eq!(config.editor.rename_policy, RenameCollisionPolicy::Overwrite);
        assert_eq!(config.editor.debounced_fields, vec!["time_investment"]);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn rejects_bad_digest() {
        let err = QuestboardConfig::from_toml_str(r#"admin_secret_sha256 = "abc""#).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn rejects_zero_limit() {
        assert!(QuestboardConfig::from_toml_str("activity_limit = 0").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "admin_secret = \"letmein\"\n[cache]\nttl_secs = 60").unwrap();
        let config = QuestboardConfig::load(file.path()).unwrap();
        assert_eq!(config.admin_secret.as_deref(), Some("letmein"));
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn builders() {
        let config = QuestboardConfig::new()
            .with_debounce(Duration::from_secs(1))
            .with_activity_limit(3)
            .with_cache(10, Duration::from_secs(5));
        assert_eq!(config.editor.debounce, Duration::from_secs(1));
        assert_eq!(config.activity_limit, 3);
        assert_eq!(config.cache.capacity, 10);
    }
}
