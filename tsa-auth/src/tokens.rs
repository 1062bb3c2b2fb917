//! Single-use, hashed tokens for email verification and password reset.
//! Only `sha256(token)` is ever persisted; the plaintext token is
//! handed to the caller once, to embed in a verification/reset link.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const VERIFICATION_TTL_SECS: i64 = 24 * 60 * 60;
pub const RESET_TTL_SECS: i64 = 60 * 60;

pub struct IssuedToken {
    pub plaintext: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn issue(ttl_secs: i64) -> IssuedToken {
    let plaintext = random_token();
    let hash = hash_token(&plaintext);
    let expires_at = Utc::now() + ChronoDuration::seconds(ttl_secs);
    IssuedToken { plaintext, hash, expires_at }
}

pub fn is_expired(expires_at: DateTime<Utc>) -> bool {
    expires_at < Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
    }

    #[test]
    fn different_tokens_hash_differently() {
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn issued_tokens_are_not_expired_immediately() {
        let token = issue(VERIFICATION_TTL_SECS);
        assert!(!is_expired(token.expires_at));
    }

    #[test]
    fn issue_generates_distinct_plaintexts() {
        let a = issue(RESET_TTL_SECS);
        let b = issue(RESET_TTL_SECS);
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.hash, b.hash);
    }
}
