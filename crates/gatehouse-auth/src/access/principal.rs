//! The authenticated caller.

use serde::{Deserialize, Serialize};

use gatehouse_core::types::SubjectId;

use crate::token::Claims;

/// Identity attached to a request once its token has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Subject identifier, used as the policy subject.
    pub subject_id: SubjectId,
    /// Display name.
    pub username: String,
    /// Contact address.
    pub email: String,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            subject_id: claims.user_id,
            username: claims.username,
            email: claims.email,
        }
    }
}
