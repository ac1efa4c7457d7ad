//! Admin password gate for destructive controls

use sha2::{Digest, Sha256};

/// Guards the "clear conversation" control
///
/// Only a SHA-256 digest of the configured password is kept in memory.
/// When no password is configured the gate is open.
#[derive(Clone, Default)]
pub struct AdminGate {
    digest: Option<[u8; 32]>,
}

impl AdminGate {
    /// Build a gate from the optional configured password
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::admin::AdminGate;
    ///
    /// let gate = AdminGate::new(Some("hunter2"));
    /// assert!(gate.verify(Some("hunter2")));
    /// assert!(!gate.verify(Some("hunter3")));
    /// assert!(!gate.verify(None));
    /// ```
    pub fn new(password: Option<&str>) -> Self {
        let digest = password
            .filter(|p| !p.is_empty())
            .map(|p| Sha256::digest(p.as_bytes()).into());
        Self { digest }
    }

    /// True when a password is configured
    pub fn is_protected(&self) -> bool {
        self.digest.is_some()
    }

    /// Check a supplied password
    pub fn verify(&self, password: Option<&str>) -> bool {
        let Some(expected) = &self.digest else {
            return true;
        };
        let Some(password) = password else {
            return false;
        };
        let supplied: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        supplied
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGate")
            .field("protected", &self.is_protected())
            .finish()
    }
}
