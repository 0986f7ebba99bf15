use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;
use uuid::Uuid;

use formguide_shared::clients::db::{checkout, DbPool};
use formguide_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Credential, NewCredential, NewOtp, OtpRecord};
use crate::schema::{credentials, otp_codes};
use crate::store::CredentialStore;

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for PgCredentialStore {
    fn find_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        let mut conn = checkout(&self.pool)?;
        let found = credentials::table
            .filter(credentials::email.eq(email))
            .select(Credential::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(found)
    }

    fn find_by_id(&self, id: Uuid) -> AppResult<Option<Credential>> {
        let mut conn = checkout(&self.pool)?;
        let found = credentials::table
            .find(id)
            .select(Credential::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(found)
    }

    fn find_by_verification_token(&self, token_hash: &str, now: DateTime<Utc>) -> AppResult<Option<Credential>> {
        let mut conn = checkout(&self.pool)?;
        let found = credentials::table
            .filter(credentials::verification_token_hash.eq(token_hash))
            .filter(credentials::verification_expires_at.gt(now))
            .select(Credential::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(found)
    }

    fn create(&self, credential: NewCredential) -> AppResult<Credential> {
        let mut conn = checkout(&self.pool)?;
        diesel::insert_into(credentials::table)
            .values(&credential)
            .returning(Credential::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    AppError::new(ErrorCode::EmailAlreadyExists, "email already registered")
                }
                other => other.into(),
            })
    }

    fn save(&self, credential: &Credential) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::update(credential).set(credential).execute(&mut conn)?;
        Ok(())
    }

    fn find_otp_by_email(&self, email: &str, now: DateTime<Utc>) -> AppResult<Option<OtpRecord>> {
        let mut conn = checkout(&self.pool)?;
        let found = otp_codes::table
            .filter(otp_codes::email.eq(email))
            .filter(otp_codes::expires_at.gt(now))
            .select(OtpRecord::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(found)
    }

    fn delete_otp_by_email(&self, email: &str) -> AppResult<usize> {
        let mut conn = checkout(&self.pool)?;
        let deleted = diesel::delete(otp_codes::table.filter(otp_codes::email.eq(email)))
            .execute(&mut conn)?;
        Ok(deleted)
    }

    fn delete_otp_by_id(&self, id: Uuid) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::delete(otp_codes::table.find(id)).execute(&mut conn)?;
        Ok(())
    }

    fn create_otp(&self, otp: NewOtp) -> AppResult<OtpRecord> {
        let mut conn = checkout(&self.pool)?;
        // A concurrent issuance may have inserted between our delete and insert; last writer wins.
        let record = diesel::insert_into(otp_codes::table)
            .values(&otp)
            .on_conflict(otp_codes::email)
            .do_update()
            .set((
                otp_codes::id.eq(excluded(otp_codes::id)),
                otp_codes::code_hash.eq(excluded(otp_codes::code_hash)),
                otp_codes::created_at.eq(excluded(otp_codes::created_at)),
                otp_codes::expires_at.eq(excluded(otp_codes::expires_at)),
            ))
            .returning(OtpRecord::as_returning())
            .get_result(&mut conn)?;
        Ok(record)
    }

    fn purge_expired_otps(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let mut conn = checkout(&self.pool)?;
        let purged = diesel::delete(otp_codes::table.filter(otp_codes::expires_at.le(now)))
            .execute(&mut conn)?;
        Ok(purged)
    }

    fn ping(&self) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}
