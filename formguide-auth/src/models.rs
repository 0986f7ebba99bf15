use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use formguide_shared::types::auth::AuthUser;

use crate::schema::{credentials, otp_codes};

// --- Credentials ---

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, AsChangeset, Serialize)]
#[diesel(table_name = credentials)]
#[diesel(treat_none_as_null = true)]
pub struct Credential {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn mark_verified(&mut self, now: DateTime<Utc>) {
        self.email_verified = true;
        self.verification_token_hash = None;
        self.verification_expires_at = None;
        self.updated_at = now;
    }
}

impl From<Credential> for AuthUser {
    fn from(c: Credential) -> Self {
        Self {
            id: c.id,
            username: c.username,
            email: c.email,
            email_verified: c.email_verified,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credentials)]
pub struct NewCredential {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub verification_token_hash: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewCredential {
    /// A fresh, unverified identity awaiting redemption of `token_hash`.
    pub fn pending(
        username: String,
        email: String,
        password_hash: String,
        token_hash: String,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            username,
            email,
            password_hash,
            email_verified: false,
            verification_token_hash: Some(token_hash),
            verification_expires_at: Some(expires_at),
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<NewCredential> for Credential {
    fn from(n: NewCredential) -> Self {
        Self {
            id: n.id,
            username: n.username,
            email: n.email,
            password_hash: n.password_hash,
            email_verified: n.email_verified,
            verification_token_hash: n.verification_token_hash,
            verification_expires_at: n.verification_expires_at,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

// --- OTP codes ---

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = otp_codes)]
pub struct OtpRecord {
    pub id: Uuid,
    pub email: String,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = otp_codes)]
pub struct NewOtp {
    pub id: Uuid,
    pub email: String,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewOtp {
    pub fn new(email: String, code_hash: String, now: DateTime<Utc>, ttl_secs: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            email,
            code_hash,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_secs),
        }
    }
}

impl From<NewOtp> for OtpRecord {
    fn from(n: NewOtp) -> Self {
        Self {
            id: n.id,
            email: n.email,
            code_hash: n.code_hash,
            created_at: n.created_at,
            expires_at: n.expires_at,
        }
    }
}
