//! bcrypt password hashing at a fixed cost factor.

use crate::error::AuthError;

const BCRYPT_COST: u32 = 12;

pub fn hash(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AuthError::Internal(e.into()))
}

pub fn verify(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_succeeds() {
        let hashed = hash("correct horse battery staple").unwrap();
        assert!(verify("correct horse battery staple", &hashed).unwrap());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hashed = hash("correct horse battery staple").unwrap();
        assert!(!verify("wrong password", &hashed).unwrap());
    }

    #[test]
    fn hash_uses_cost_factor_twelve() {
        let hashed = hash("whatever").unwrap();
        assert!(hashed.starts_with("$2b$12$") || hashed.starts_with("$2y$12$") || hashed.starts_with("$2a$12$"));
    }
}
