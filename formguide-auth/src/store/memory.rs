use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use formguide_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Credential, NewCredential, NewOtp, OtpRecord};
use crate::store::CredentialStore;

#[derive(Default)]
struct Records {
    credentials: HashMap<Uuid, Credential>,
    // keyed by email: one live code per address
    otps: HashMap<String, OtpRecord>,
}

/// In-process store used by the service and router tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<Records>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Records>> {
        self.records
            .lock()
            .map_err(|_| AppError::internal("credential store lock poisoned"))
    }

    /// Number of OTP rows held for the email, expired or not.
    pub fn otp_rows(&self, email: &str) -> usize {
        self.lock().map(|r| r.otps.contains_key(email) as usize).unwrap_or(0)
    }

    pub fn total_otp_rows(&self) -> usize {
        self.lock().map(|r| r.otps.len()).unwrap_or(0)
    }

    /// Moves the OTP expiry for `email` to `at`.
    pub fn set_otp_expiry(&self, email: &str, at: DateTime<Utc>) {
        if let Ok(mut r) = self.lock() {
            if let Some(otp) = r.otps.get_mut(email) {
                otp.expires_at = at;
            }
        }
    }

    /// Moves the verification token expiry for `email` to `at`.
    pub fn set_verification_expiry(&self, email: &str, at: DateTime<Utc>) {
        if let Ok(mut r) = self.lock() {
            if let Some(c) = r.credentials.values_mut().find(|c| c.email == email) {
                c.verification_expires_at = Some(at);
            }
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn find_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        let r = self.lock()?;
        Ok(r.credentials.values().find(|c| c.email == email).cloned())
    }

    fn find_by_id(&self, id: Uuid) -> AppResult<Option<Credential>> {
        Ok(self.lock()?.credentials.get(&id).cloned())
    }

    fn find_by_verification_token(&self, token_hash: &str, now: DateTime<Utc>) -> AppResult<Option<Credential>> {
        let r = self.lock()?;
        Ok(r.credentials
            .values()
            .find(|c| {
                c.verification_token_hash.as_deref() == Some(token_hash)
                    && c.verification_expires_at.is_some_and(|at| at > now)
            })
            .cloned())
    }

    fn create(&self, credential: NewCredential) -> AppResult<Credential> {
        let mut r = self.lock()?;
        if r.credentials.values().any(|c| c.email == credential.email) {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
        }
        let credential = Credential::from(credential);
        r.credentials.insert(credential.id, credential.clone());
        Ok(credential)
    }

    fn save(&self, credential: &Credential) -> AppResult<()> {
        let mut r = self.lock()?;
        match r.credentials.get_mut(&credential.id) {
            Some(existing) => {
                *existing = credential.clone();
                Ok(())
            }
            None => Err(AppError::Database(diesel::result::Error::NotFound)),
        }
    }

    fn find_otp_by_email(&self, email: &str, now: DateTime<Utc>) -> AppResult<Option<OtpRecord>> {
        let r = self.lock()?;
        Ok(r.otps.get(email).filter(|otp| otp.is_live(now)).cloned())
    }

    fn delete_otp_by_email(&self, email: &str) -> AppResult<usize> {
        Ok(self.lock()?.otps.remove(email).map_or(0, |_| 1))
    }

    fn delete_otp_by_id(&self, id: Uuid) -> AppResult<()> {
        self.lock()?.otps.retain(|_, otp| otp.id != id);
        Ok(())
    }

    fn create_otp(&self, otp: NewOtp) -> AppResult<OtpRecord> {
        let record = OtpRecord::from(otp);
        self.lock()?.otps.insert(record.email.clone(), record.clone());
        Ok(record)
    }

    fn purge_expired_otps(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let mut r = self.lock()?;
        let before = r.otps.len();
        r.otps.retain(|_, otp| otp.is_live(now));
        Ok(before - r.otps.len())
    }

    fn ping(&self) -> AppResult<()> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(email: &str) -> NewCredential {
        let now = Utc::now();
        NewCredential::pending(
            "alice".into(),
            email.into(),
            "hash".into(),
            "digest".into(),
            now + chrono::Duration::hours(1),
            now,
        )
    }

    #[test]
    fn duplicate_email_conflicts() {
        let store = MemoryCredentialStore::new();
        store.create(pending("a@x.com")).unwrap();
        let err = store.create(pending("a@x.com")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmailAlreadyExists);

        // case-sensitive: a different string is a different identity
        assert!(store.create(pending("A@x.com")).is_ok());
    }

    #[test]
    fn expired_records_are_invisible() {
        let store = MemoryCredentialStore::new();
        let now = Utc::now();
        store.create(pending("a@x.com")).unwrap();
        store.create_otp(NewOtp::new("a@x.com".into(), "h".into(), now, 600)).unwrap();

        assert!(store.find_by_verification_token("digest", now).unwrap().is_some());
        assert!(store.find_otp_by_email("a@x.com", now).unwrap().is_some());

        let later = now + chrono::Duration::hours(2);
        assert!(store.find_by_verification_token("digest", later).unwrap().is_none());
        assert!(store.find_otp_by_email("a@x.com", later).unwrap().is_none());

        assert_eq!(store.purge_expired_otps(later).unwrap(), 1);
        assert_eq!(store.total_otp_rows(), 0);
    }
}
