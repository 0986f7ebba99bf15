//! Credential Store: identity records and OTP records.
//!
//! The store is the only owner of both record kinds. Lookups that involve an
//! expiry take `now` explicitly and never return an expired record, so expiry
//! holds regardless of when the sweep last ran.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use formguide_shared::errors::AppResult;
use formguide_shared::middleware::IdentityLookup;
use formguide_shared::types::auth::AuthUser;

use crate::models::{Credential, NewCredential, NewOtp, OtpRecord};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgCredentialStore;

pub trait CredentialStore: Send + Sync {
    /// Exact, case-sensitive match on the stored email.
    fn find_by_email(&self, email: &str) -> AppResult<Option<Credential>>;
    fn find_by_id(&self, id: Uuid) -> AppResult<Option<Credential>>;
    /// Identity holding this verification token digest with an expiry after `now`.
    fn find_by_verification_token(&self, token_hash: &str, now: DateTime<Utc>) -> AppResult<Option<Credential>>;
    /// Fails with `EmailAlreadyExists` if the email is taken, atomically.
    fn create(&self, credential: NewCredential) -> AppResult<Credential>;
    fn save(&self, credential: &Credential) -> AppResult<()>;

    /// Live OTP for the email, if any.
    fn find_otp_by_email(&self, email: &str, now: DateTime<Utc>) -> AppResult<Option<OtpRecord>>;
    fn delete_otp_by_email(&self, email: &str) -> AppResult<usize>;
    fn delete_otp_by_id(&self, id: Uuid) -> AppResult<()>;
    fn create_otp(&self, otp: NewOtp) -> AppResult<OtpRecord>;
    fn purge_expired_otps(&self, now: DateTime<Utc>) -> AppResult<usize>;

    fn ping(&self) -> AppResult<()>;
}

/// Adapts a credential store to the session gate's identity lookup.
pub struct StoreIdentities(pub Arc<dyn CredentialStore>);

impl IdentityLookup for StoreIdentities {
    fn find_identity(&self, id: Uuid) -> AppResult<Option<AuthUser>> {
        Ok(self.0.find_by_id(id)?.map(AuthUser::from))
    }
}
