//! Bearer credential with an absolute expiry

use serde::{Deserialize, Serialize};

/// A bearer token plus the epoch second after which it is dead.
///
/// A credential is replaced wholesale on login and destroyed on logout;
/// its fields are never updated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Opaque bearer token
    pub token: String,
    /// Absolute expiry, epoch seconds
    #[serde(rename = "expires")]
    pub expires_at: i64,
}

impl Credential {
    /// Create a credential
    pub fn new(token: impl Into<String>, expires_at: i64) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// The absent credential
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the token is empty
    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }

    /// Valid iff the token is non-empty and the expiry is strictly in the future
    pub fn is_valid(&self, now: i64) -> bool {
        !self.token.is_empty() && self.expires_at > now
    }

    /// Seconds left before expiry (negative once expired)
    pub fn remaining(&self, now: i64) -> i64 {
        self.expires_at - now
    }
}
