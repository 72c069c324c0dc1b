//! Image access gate: a stateless shared-secret check per run.

use sha2::{Digest, Sha256};

use crate::types::{ArenaError, Category, Result};

#[derive(Clone, Default)]
pub struct AccessGate {
    /// SHA-256 of the configured image password; None leaves images open
    image_password: Option<[u8; 32]>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("image_password", &self.image_password.map(|_| "[REDACTED]"))
            .finish()
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(value.as_bytes()));
    out
}

/// Compare a supplied secret against the expected one by digest
pub fn secrets_match(given: &str, expected: &str) -> bool {
    digest(given) == digest(expected)
}

impl AccessGate {
    /// An empty configured password counts as unset
    pub fn new(image_password: Option<&str>) -> Self {
        Self {
            image_password: image_password.filter(|p| !p.is_empty()).map(digest),
        }
    }

    pub fn is_guarded(&self, category: Category) -> bool {
        category == Category::Image && self.image_password.is_some()
    }

    /// Reject a guarded category unless the supplied password matches
    pub fn check(&self, category: Category, password: Option<&str>) -> Result<()> {
        if !self.is_guarded(category) {
            return Ok(());
        }

        let matches = match (self.image_password, password) {
            (Some(expected), Some(given)) => digest(given) == expected,
            _ => false,
        };

        if matches {
            Ok(())
        } else {
            Err(ArenaError::Unauthorized(format!(
                "a valid password is required to run the {} category",
                category
            )))
        }
    }
}
