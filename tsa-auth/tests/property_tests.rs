//! Property-based coverage for the pieces of `tsa-auth` that are pure
//! functions of their input rather than database-backed flows (those are
//! covered by the inline `#[cfg(test)]` modules instead).

use std::time::Duration;

use proptest::prelude::*;
use tsa_auth::rate_limit::RateLimiter;
use tsa_auth::{TokenIssuer, TokenType};
use tsa_core::ids::{RoleId, UserId};

proptest! {
    /// Any access token issued for `(user_id, role_id)` verifies back to
    /// the same pair, for every id the JWT subject/claim encoding accepts.
    #[test]
    fn access_token_round_trips_for_any_ids(user_id in 1i64..=i64::MAX, role_id in 1i64..=i64::MAX) {
        let issuer = TokenIssuer::new(
            "property-test-secret-long-enough",
            Duration::from_secs(1800),
            Duration::from_secs(604_800),
        );
        let token = issuer.issue_access(UserId(user_id), RoleId(role_id)).unwrap();
        let claims = issuer.verify(&token, TokenType::Access).unwrap();
        prop_assert_eq!(claims.sub, user_id.to_string());
        prop_assert_eq!(claims.role_id, role_id);
    }

    /// A sliding-window limiter never admits more than `max_requests`
    /// calls within the window, regardless of how many calls are made.
    #[test]
    fn limiter_never_exceeds_its_configured_ceiling(
        max_requests in 1usize..20,
        attempts in 0usize..40,
    ) {
        let limiter = RateLimiter::new(max_requests, Duration::from_secs(300));
        let admitted = (0..attempts).filter(|_| limiter.check("k").is_ok()).count();
        prop_assert!(admitted <= max_requests);
    }

    /// Distinct keys never share a budget.
    #[test]
    fn limiter_keys_never_interfere(max_requests in 1usize..10, extra_key in "[a-z]{1,12}") {
        prop_assume!(extra_key != "k");
        let limiter = RateLimiter::new(max_requests, Duration::from_secs(300));
        for _ in 0..max_requests {
            prop_assert!(limiter.check("k").is_ok());
        }
        prop_assert!(limiter.check("k").is_err());
        prop_assert!(limiter.check(&extra_key).is_ok());
    }
}
