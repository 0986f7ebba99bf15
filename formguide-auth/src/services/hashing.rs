use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use formguide_shared::errors::{AppError, AppResult};

/// Salted Argon2id hashing for passwords and OTP codes.
///
/// The async entry points move the work onto the blocking pool so request
/// dispatch is never stalled by a hash.
#[derive(Clone)]
pub struct SecretHasher {
    params: Params,
}

impl SecretHasher {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> AppResult<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AppError::internal(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash_blocking(&self, plaintext: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
    }

    /// A digest that fails to parse is an internal error, not a mismatch.
    pub fn verify_blocking(&self, plaintext: &str, digest: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
        Ok(self
            .argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    }

    pub async fn hash(&self, plaintext: String) -> AppResult<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&plaintext))
            .await
            .map_err(|e| AppError::internal(format!("hashing task failed: {e}")))?
    }

    pub async fn verify(&self, plaintext: String, digest: String) -> AppResult<bool> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&plaintext, &digest))
            .await
            .map_err(|e| AppError::internal(format!("hashing task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> SecretHasher {
        SecretHasher::new(1024, 1, 1).unwrap()
    }

    #[test]
    fn digest_is_salted_and_verifiable() {
        let hasher = cheap();
        let a = hasher.hash_blocking("Secret1!").unwrap();
        let b = hasher.hash_blocking("Secret1!").unwrap();

        assert_ne!(a, "Secret1!");
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(hasher.verify_blocking("Secret1!", &a).unwrap());
        assert!(!hasher.verify_blocking("secret1!", &a).unwrap());
    }

    #[test]
    fn malformed_digest_is_an_error() {
        assert!(cheap().verify_blocking("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn rejects_impossible_params() {
        assert!(SecretHasher::new(1, 1, 1).is_err());
    }

    #[tokio::test]
    async fn async_path_runs_on_blocking_pool() {
        let hasher = cheap();
        let digest = hasher.hash("482913".into()).await.unwrap();
        assert!(hasher.verify("482913".into(), digest.clone()).await.unwrap());
        assert!(!hasher.verify("482914".into(), digest).await.unwrap());
    }
}
