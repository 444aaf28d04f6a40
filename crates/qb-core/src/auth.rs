//! Admin gate
//!
//! A single shared secret switches the UI into admin mode, which unlocks
//! edit affordances. This is a UI mode switch only; the store enforces its
//! own access rules.
//!
//! The gate keeps only the SHA-256 digest of the configured secret.

use crate::config::QuestboardConfig;
use crate::error::{CoreError, CoreResult};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

/// Mode of the current UI session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiSession {
    /// Read-only
    #[default]
    Viewer,
    /// May create, edit, delete and reorder
    Admin,
}

impl UiSession {
    /// Check if edit affordances are unlocked
    #[inline]
    #[must_use]
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }

    /// `Ok` in admin mode
    ///
    /// # Errors
    /// [`CoreError::NotAdmin`] in viewer mode.
    pub fn require_admin(self) -> CoreResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::NotAdmin)
        }
    }
}

/// Shared-secret login holding the current [`UiSession`]
#[derive(Debug, Default)]
pub struct AuthGate {
    digest: Option<[u8; 32]>,
    session: RwLock<UiSession>,
}

fn digest(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

impl AuthGate {
    /// Gate accepting `secret`; an empty secret accepts nothing
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            digest: (!secret.is_empty()).then(|| digest(secret)),
            session: RwLock::new(UiSession::Viewer),
        }
    }

    /// Gate accepting the secret whose SHA-256 is `hex_digest`
    ///
    /// # Errors
    /// [`CoreError::Config`] if `hex_digest` is not 32 hex-encoded bytes.
    pub fn from_hex_digest(hex_digest: &str) -> CoreResult<Self> {
        let bytes = hex::decode(hex_digest.trim())
            .map_err(|e| CoreError::Config(format!("admin secret digest: {e}")))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::Config("admin secret digest must be 32 bytes".into()))?;
        Ok(Self {
            digest: Some(digest),
            session: RwLock::new(UiSession::Viewer),
        })
    }

    /// Gate from configuration; no configured secret means admin mode is
    /// unreachable
    ///
    /// # Errors
    /// [`CoreError::Config`] on a malformed digest.
    pub fn from_config(config: &QuestboardConfig) -> CoreResult<Self> {
        match (&config.admin_secret_sha256, &config.admin_secret) {
            (Some(hex_digest), _) => Self::from_hex_digest(hex_digest),
            (None, Some(secret)) => Ok(Self::new(secret)),
            (None, None) => {
                tracing::warn!("no admin secret configured; admin mode disabled");
                Ok(Self::default())
            }
        }
    }

    /// Check `secret` and switch to admin mode when it matches
    ///
    /// A wrong secret leaves the current mode unchanged.
    pub fn login(&self, secret: &str) -> bool {
        let ok = self.digest.is_some_and(|d| d == digest(secret));
        if ok {
            *self.session.write() = UiSession::Admin;
            tracing::info!("admin login");
        } else {
            tracing::warn!("admin login rejected");
        }
        ok
    }

    /// Return to viewer mode
    pub fn logout(&self) {
        *self.session.write() = UiSession::Viewer;
        tracing::info!("admin logout");
    }

    /// Current mode
    #[must_use]
    pub fn session(&self) -> UiSession {
        *self.session.read()
    }

    /// Hex digest fingerprint of the configured secret, for diagnostics
    #[must_use]
    pub fn fingerprint(&self) -> Option<String> {
        self.digest.map(|d| hex::encode(&d[..4]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_logout_cycle() {
        let gate = AuthGate::new("letmein");
        assert_eq!(gate.session(), UiSession::Viewer);
        assert!(!gate.login("wrong"));
        assert!(!gate.session().is_admin());
        assert!(gate.login("letmein"));
        assert!(gate.session().is_admin());
        gate.logout();
        assert_eq!(gate.session(), UiSession::Viewer);
    }

    #[test]
    fn failed_login_keeps_admin() {
        let gate = AuthGate::new("letmein");
        assert!(gate.login("letmein"));
        assert!(!gate.login("nope"));
        assert!(gate.session().is_admin());
    }

    #[test]
    fn empty_secret_never_matches() {
        let gate = AuthGate::new("");
        assert!(!gate.login(""));
        assert!(gate.fingerprint().is_none());
    }

    #[test]
    fn hex_digest_matches_clear_secret() {
        let hex_digest = hex::encode(digest("letmein"));
        let gate = AuthGate::from_hex_digest(&hex_digest).unwrap();
        assert!(gate.login("letmein"));
        assert_eq!(gate.fingerprint(), AuthGate::new("letmein").fingerprint());
        assert!(AuthGate::from_hex_digest("zz").is_err());
        assert!(AuthGate::from_hex_digest("abcd").is_err());
    }

    #[test]
    fn digest_config_wins() {
        let config = QuestboardConfig {
            admin_secret: Some("clear".into()),
            admin_secret_sha256: Some(hex::encode(digest("hashed"))),
            ..QuestboardConfig::default()
        };
        let gate = AuthGate::from_config(&config).unwrap();
        assert!(!gate.login("clear"));
        assert!(gate.login("hashed"));
    }

    #[test]
    fn viewer_cannot_edit() {
        assert!(matches!(UiSession::Viewer.require_admin(), Err(CoreError::NotAdmin)));
        assert!(UiSession::Admin.require_admin().is_ok());
    }
}
