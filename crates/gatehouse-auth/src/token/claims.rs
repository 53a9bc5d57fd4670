//! Claims carried by every identity token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatehouse_core::types::SubjectId;

/// JWT claims payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier.
    pub user_id: SubjectId,
    /// Display name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Issuer.
    pub iss: String,
    /// Subject string (the username).
    pub sub: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch), exclusive.
    pub exp: i64,
    /// Not-before timestamp (seconds since epoch).
    pub nbf: i64,
    /// Token id, unique per issue.
    pub jti: Uuid,
}

impl Claims {
    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Whether the token is expired at `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Whether the token may not be used yet at `now`.
    pub fn is_premature_at(&self, now: i64) -> bool {
        now < self.nbf
    }
}
