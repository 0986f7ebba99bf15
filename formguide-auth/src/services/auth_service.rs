use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tokio::task::JoinHandle;

use formguide_shared::errors::{AppError, AppResult, ErrorCode};
use formguide_shared::tokens::{IssuedToken, TokenService};
use formguide_shared::types::auth::AuthUser;

use crate::models::{NewCredential, NewOtp};
use crate::services::codes::{digest_token, generate_otp_code, generate_verification_token};
use crate::services::hashing::SecretHasher;
use crate::services::notification::Notifier;
use crate::store::CredentialStore;

const MISSING_FIELDS: &str = "please enter all fields";
const PASSWORD_MISMATCH: &str = "passwords do not match";
const INVALID_CREDENTIALS: &str = "invalid email or password";
const NOT_VERIFIED: &str = "please verify your email first";
const USER_NOT_FOUND: &str = "user not found";
const INVALID_TOKEN: &str = "invalid or expired verification token";
const INVALID_OTP: &str = "invalid or expired OTP";

/// Hashed in place of a real digest when the email is unknown.
const DUMMY_PASSWORD: &str = "formguide-dummy-password";

#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub verification_ttl_secs: i64,
    pub otp_ttl_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            verification_ttl_secs: 3600,
            otp_ttl_secs: 600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone)]
pub struct ResetPasswordInput {
    pub email: String,
    pub otp: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    AlreadyVerified,
}

/// The registration, verification, login and OTP reset workflows.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: SecretHasher,
    tokens: TokenService,
    notifier: Notifier,
    settings: AuthSettings,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: SecretHasher,
        tokens: TokenService,
        notifier: Notifier,
        settings: AuthSettings,
    ) -> AppResult<Self> {
        let dummy_hash = hasher.hash_blocking(DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            hasher,
            tokens,
            notifier,
            settings,
            dummy_hash,
        })
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthUser> {
        let RegisterInput { username, email, password, confirm_password } = input;
        require(&[&username, &email, &password, &confirm_password])?;
        if password != confirm_password {
            return Err(AppError::Validation(PASSWORD_MISMATCH.into()));
        }

        if self.store.find_by_email(&email)?.is_some() {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
        }

        let password_hash = self.hasher.hash(password).await?;
        let token = generate_verification_token();
        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(self.settings.verification_ttl_secs);

        // The store's unique index decides any race the check above missed.
        let credential = self.store.create(NewCredential::pending(
            username,
            email,
            password_hash,
            digest_token(&token),
            expires_at,
            now,
        ))?;

        counter!("auth_registrations_total").increment(1);
        tracing::info!(user_id = %credential.id, "identity registered");

        // Not rolled back on failure: the user can ask for a new link.
        self.notifier
            .send_verification(&credential.email, &credential.username, &token)
            .await?;

        Ok(credential.into())
    }

    pub async fn verify_email(&self, token: &str) -> AppResult<AuthUser> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::new(ErrorCode::VerificationTokenInvalid, INVALID_TOKEN));
        }

        let now = Utc::now();
        let mut credential = self
            .store
            .find_by_verification_token(&digest_token(token), now)?
            .ok_or_else(|| AppError::new(ErrorCode::VerificationTokenInvalid, INVALID_TOKEN))?;

        credential.mark_verified(now);
        self.store.save(&credential)?;

        tracing::info!(user_id = %credential.id, "email verified");
        Ok(credential.into())
    }

    /// Issues a fresh verification link, replacing the previous token.
    pub async fn resend_verification(&self, email: &str) -> AppResult<ResendOutcome> {
        require(&[email])?;

        let mut credential = self
            .store
            .find_by_email(email)?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

        if credential.email_verified {
            return Ok(ResendOutcome::AlreadyVerified);
        }

        let token = generate_verification_token();
        let now = Utc::now();
        credential.verification_token_hash = Some(digest_token(&token));
        credential.verification_expires_at =
            Some(now + chrono::Duration::seconds(self.settings.verification_ttl_secs));
        credential.updated_at = now;
        self.store.save(&credential)?;

        tracing::info!(user_id = %credential.id, "verification token rotated");
        self.notifier
            .send_verification(&credential.email, &credential.username, &token)
            .await?;

        Ok(ResendOutcome::Sent)
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginOutcome> {
        require(&[email, password])?;

        let Some(credential) = self.store.find_by_email(email)? else {
            // Same cost as a real mismatch.
            let _ = self.hasher.verify(password.to_string(), self.dummy_hash.clone()).await;
            counter!("auth_logins_total", "outcome" => "invalid_credentials").increment(1);
            return Err(AppError::new(ErrorCode::InvalidCredentials, INVALID_CREDENTIALS));
        };

        let valid = self
            .hasher
            .verify(password.to_string(), credential.password_hash.clone())
            .await?;
        if !valid {
            counter!("auth_logins_total", "outcome" => "invalid_credentials").increment(1);
            tracing::debug!(user_id = %credential.id, "login rejected: wrong password");
            return Err(AppError::new(ErrorCode::InvalidCredentials, INVALID_CREDENTIALS));
        }

        if !credential.email_verified {
            counter!("auth_logins_total", "outcome" => "unverified").increment(1);
            return Err(AppError::new(ErrorCode::EmailNotVerified, NOT_VERIFIED));
        }

        let token = self.tokens.issue(credential.id)?;
        counter!("auth_logins_total", "outcome" => "success").increment(1);
        tracing::info!(user_id = %credential.id, "login succeeded");

        Ok(LoginOutcome {
            token,
            user: credential.into(),
        })
    }

    /// Shared by send-otp and forgot-password.
    pub async fn request_otp(&self, email: &str) -> AppResult<()> {
        require(&[email])?;

        let credential = self
            .store
            .find_by_email(email)?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
        if !credential.email_verified {
            return Err(AppError::new(ErrorCode::EmailNotVerified, NOT_VERIFIED));
        }

        let code = generate_otp_code();
        let code_hash = self.hasher.hash(code.clone()).await?;
        let now = Utc::now();

        self.store.delete_otp_by_email(&credential.email)?;
        self.store.create_otp(NewOtp::new(
            credential.email.clone(),
            code_hash,
            now,
            self.settings.otp_ttl_secs,
        ))?;

        counter!("auth_otp_issued_total").increment(1);
        tracing::info!(user_id = %credential.id, "password reset code issued");

        self.notifier.send_otp(&credential.email, &code).await
    }

    pub async fn reset_password(&self, input: ResetPasswordInput) -> AppResult<()> {
        let ResetPasswordInput { email, otp, new_password, confirm_password } = input;
        require(&[&email, &otp, &new_password, &confirm_password])?;
        if new_password != confirm_password {
            return Err(AppError::Validation(PASSWORD_MISMATCH.into()));
        }

        let mut credential = self
            .store
            .find_by_email(&email)?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
        if !credential.email_verified {
            return Err(AppError::new(ErrorCode::EmailNotVerified, NOT_VERIFIED));
        }

        let record = self
            .store
            .find_otp_by_email(&email, Utc::now())?
            .ok_or_else(|| AppError::new(ErrorCode::OtpInvalid, INVALID_OTP))?;

        if !self.hasher.verify(otp, record.code_hash.clone()).await? {
            tracing::debug!(user_id = %credential.id, "password reset rejected: code mismatch");
            return Err(AppError::new(ErrorCode::OtpInvalid, INVALID_OTP));
        }

        credential.password_hash = self.hasher.hash(new_password).await?;
        credential.updated_at = Utc::now();
        self.store.save(&credential)?;
        self.store.delete_otp_by_id(record.id)?;

        counter!("auth_password_resets_total").increment(1);
        tracing::info!(user_id = %credential.id, "password reset");
        Ok(())
    }

    pub fn sweep_expired_otps(&self) -> AppResult<usize> {
        let purged = self.store.purge_expired_otps(Utc::now())?;
        if purged > 0 {
            tracing::debug!(purged, "expired OTP records purged");
        }
        Ok(purged)
    }
}

/// Periodically deletes expired OTP records. Lookups already ignore them;
/// this only keeps the table small.
pub fn spawn_otp_sweeper(service: Arc<AuthService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = service.sweep_expired_otps() {
                tracing::warn!(error = %e, "OTP sweep failed");
            }
        }
    })
}

fn require(fields: &[&str]) -> AppResult<()> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(AppError::Validation(MISSING_FIELDS.into()));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::services::notification::testing::{code_from_email, token_from_link};

    async fn verified(h: &Harness, email: &str, password: &str) -> AuthUser {
        h.service.register(register_input("alice", email, password)).await.unwrap();
        let token = token_from_link(&h.mailer.last_to(email).unwrap().html);
        h.service.verify_email(&token).await.unwrap()
    }

    fn reset_input(email: &str, otp: &str, password: &str) -> ResetPasswordInput {
        ResetPasswordInput {
            email: email.into(),
            otp: otp.into(),
            new_password: password.into(),
            confirm_password: password.into(),
        }
    }

    #[tokio::test]
    async fn registration_stores_hash_and_starts_unverified() {
        let h = harness();
        let user = h.service.register(register_input("alice", "a@x.com", "Secret1!")).await.unwrap();

        assert!(!user.email_verified);
        let stored = h.store.find_by_email("a@x.com").unwrap().unwrap();
        assert_ne!(stored.password_hash, "Secret1!");
        assert!(stored.verification_token_hash.is_some());

        let token = token_from_link(&h.mailer.last_to("a@x.com").unwrap().html);
        // only the digest is persisted
        assert_ne!(stored.verification_token_hash.as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn registration_validates_fields() {
        let h = harness();

        let missing = h.service.register(register_input("", "a@x.com", "Secret1!")).await.unwrap_err();
        assert_eq!(missing.code(), ErrorCode::ValidationError);

        let mut mismatch = register_input("alice", "a@x.com", "Secret1!");
        mismatch.confirm_password = "Secret2!".into();
        let err = h.service.register(mismatch).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.to_string(), "validation error: passwords do not match");

        assert!(h.store.find_by_email("a@x.com").unwrap().is_none());
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let h = harness();
        h.service.register(register_input("alice", "a@x.com", "Secret1!")).await.unwrap();
        let err = h.service.register(register_input("alice2", "a@x.com", "Other1!")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmailAlreadyExists);
    }

    #[tokio::test]
    async fn failed_email_keeps_identity() {
        let h = harness();
        h.mailer.fail_sends(true);

        let err = h.service.register(register_input("alice", "a@x.com", "Secret1!")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmailDeliveryFailed);
        assert!(h.store.find_by_email("a@x.com").unwrap().is_some());

        // and a new link can still be requested
        h.mailer.fail_sends(false);
        assert_eq!(h.service.resend_verification("a@x.com").await.unwrap(), ResendOutcome::Sent);
    }

    #[tokio::test]
    async fn verification_token_works_once() {
        let h = harness();
        h.service.register(register_input("alice", "a@x.com", "Secret1!")).await.unwrap();
        let token = token_from_link(&h.mailer.last_to("a@x.com").unwrap().html);

        let user = h.service.verify_email(&token).await.unwrap();
        assert!(user.email_verified);

        let stored = h.store.find_by_email("a@x.com").unwrap().unwrap();
        assert!(stored.verification_token_hash.is_none());
        assert!(stored.verification_expires_at.is_none());

        let again = h.service.verify_email(&token).await.unwrap_err();
        assert_eq!(again.code(), ErrorCode::VerificationTokenInvalid);
    }

    #[tokio::test]
    async fn expired_token_fails_like_unknown() {
        let h = harness();
        h.service.register(register_input("alice", "a@x.com", "Secret1!")).await.unwrap();
        let token = token_from_link(&h.mailer.last_to("a@x.com").unwrap().html);
        h.store.set_verification_expiry("a@x.com", Utc::now() - chrono::Duration::seconds(1));

        let expired = h.service.verify_email(&token).await.unwrap_err();
        let unknown = h.service.verify_email("feedface").await.unwrap_err();
        assert_eq!(expired.code(), unknown.code());
        assert_eq!(expired.to_string(), unknown.to_string());
        assert!(!h.store.find_by_email("a@x.com").unwrap().unwrap().email_verified);
    }

    #[tokio::test]
    async fn resend_rotates_token() {
        let h = harness();
        h.service.register(register_input("alice", "a@x.com", "Secret1!")).await.unwrap();
        let first = token_from_link(&h.mailer.last_to("a@x.com").unwrap().html);

        h.service.resend_verification("a@x.com").await.unwrap();
        let second = token_from_link(&h.mailer.last_to("a@x.com").unwrap().html);
        assert_ne!(first, second);

        assert!(h.service.verify_email(&first).await.is_err());
        assert!(h.service.verify_email(&second).await.is_ok());
        assert_eq!(
            h.service.resend_verification("a@x.com").await.unwrap(),
            ResendOutcome::AlreadyVerified
        );

        let err = h.service.resend_verification("nobody@x.com").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let h = harness();
        verified(&h, "a@x.com", "Secret1!").await;

        let wrong = h.service.login("a@x.com", "nope").await.unwrap_err();
        let unknown = h.service.login("b@x.com", "Secret1!").await.unwrap_err();

        assert_eq!(wrong.code(), ErrorCode::InvalidCredentials);
        assert_eq!(wrong.code(), unknown.code());
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn unverified_login_is_refused() {
        let h = harness();
        h.service.register(register_input("alice", "a@x.com", "Secret1!")).await.unwrap();

        let err = h.service.login("a@x.com", "Secret1!").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmailNotVerified);

        // a wrong password still reads as bad credentials
        let err = h.service.login("a@x.com", "nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
    }

    #[tokio::test]
    async fn login_issues_token_for_identity() {
        let h = harness();
        let user = verified(&h, "a@x.com", "Secret1!").await;

        let outcome = h.service.login("a@x.com", "Secret1!").await.unwrap();
        assert_eq!(outcome.user.id, user.id);
        assert_eq!(outcome.token.expires_in, 30 * 24 * 3600);
        assert_eq!(h.tokens.verify(&outcome.token.token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn otp_requires_known_verified_identity() {
        let h = harness();
        let err = h.service.request_otp("nobody@x.com").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        h.service.register(register_input("alice", "a@x.com", "Secret1!")).await.unwrap();
        let err = h.service.request_otp("a@x.com").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmailNotVerified);
        assert_eq!(h.store.total_otp_rows(), 0);
    }

    #[tokio::test]
    async fn second_otp_replaces_first() {
        let h = harness();
        verified(&h, "a@x.com", "Secret1!").await;

        h.service.request_otp("a@x.com").await.unwrap();
        let first = code_from_email(&h.mailer.last_to("a@x.com").unwrap().html);
        h.service.request_otp("a@x.com").await.unwrap();
        let second = code_from_email(&h.mailer.last_to("a@x.com").unwrap().html);

        assert_eq!(h.store.otp_rows("a@x.com"), 1);
        let stored = h.store.find_otp_by_email("a@x.com", Utc::now()).unwrap().unwrap();
        assert_ne!(stored.code_hash, second);

        if first != second {
            let err = h.service.reset_password(reset_input("a@x.com", &first, "NewPass1!")).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::OtpInvalid);
        }
        h.service.reset_password(reset_input("a@x.com", &second, "NewPass1!")).await.unwrap();
    }

    #[tokio::test]
    async fn expired_or_wrong_otp_leaves_password_unchanged() {
        let h = harness();
        verified(&h, "a@x.com", "Secret1!").await;
        h.service.request_otp("a@x.com").await.unwrap();
        let code = code_from_email(&h.mailer.last_to("a@x.com").unwrap().html);

        let wrong = if code == "111111" { "222222" } else { "111111" };
        let err = h.service.reset_password(reset_input("a@x.com", wrong, "NewPass1!")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::OtpInvalid);

        h.store.set_otp_expiry("a@x.com", Utc::now() - chrono::Duration::seconds(1));
        let err = h.service.reset_password(reset_input("a@x.com", &code, "NewPass1!")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::OtpInvalid);

        assert!(h.service.login("a@x.com", "Secret1!").await.is_ok());
        assert!(h.service.login("a@x.com", "NewPass1!").await.is_err());
    }

    #[tokio::test]
    async fn reset_consumes_code() {
        let h = harness();
        verified(&h, "a@x.com", "Secret1!").await;
        h.service.request_otp("a@x.com").await.unwrap();
        let code = code_from_email(&h.mailer.last_to("a@x.com").unwrap().html);

        h.service.reset_password(reset_input("a@x.com", &code, "NewPass1!")).await.unwrap();
        assert_eq!(h.store.otp_rows("a@x.com"), 0);
        assert!(h.service.login("a@x.com", "NewPass1!").await.is_ok());

        let replay = h.service.reset_password(reset_input("a@x.com", &code, "Other1!")).await.unwrap_err();
        assert_eq!(replay.code(), ErrorCode::OtpInvalid);
    }

    #[tokio::test]
    async fn reset_checks_confirmation_and_identity() {
        let h = harness();
        let mut mismatch = reset_input("a@x.com", "123456", "NewPass1!");
        mismatch.confirm_password = "Other1!".into();
        assert_eq!(h.service.reset_password(mismatch).await.unwrap_err().code(), ErrorCode::ValidationError);

        let err = h.service.reset_password(reset_input("a@x.com", "123456", "NewPass1!")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn sweep_purges_only_expired() {
        let h = harness();
        verified(&h, "a@x.com", "Secret1!").await;
        h.service.request_otp("a@x.com").await.unwrap();

        assert_eq!(h.service.sweep_expired_otps().unwrap(), 0);
        h.store.set_otp_expiry("a@x.com", Utc::now() - chrono::Duration::seconds(1));
        assert_eq!(h.service.sweep_expired_otps().unwrap(), 1);
        assert_eq!(h.store.total_otp_rows(), 0);
    }
}
