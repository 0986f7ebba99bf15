use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

/// Opaque verification token: 32 random bytes, hex-encoded.
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Verification tokens are stored as their SHA-256 digest.
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Six-digit OTP, uniform over 100000..=999999.
pub fn generate_otp_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..1000 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn tokens_are_unique_and_digest_is_stable() {
        let a = generate_verification_token();
        let b = generate_verification_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(digest_token(&a), digest_token(&a));
        assert_ne!(digest_token(&a), a);
    }
}
