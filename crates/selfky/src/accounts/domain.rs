use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::admissions::domain::UserId;

/// Registered account. Never hard-deleted; password resets rotate the hash
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub reset_token: Option<ResetToken>,
    pub created_at: DateTime<Utc>,
}

/// Single-use password-reset token with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
