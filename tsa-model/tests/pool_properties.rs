//! Property-based coverage for `BackendPool`'s selection invariants across
//! arbitrary instance lists and health states.

use std::time::Duration;

use proptest::prelude::*;
use tsa_core::query::BackendSpecialization;
use tsa_model::BackendPool;

fn instance_specs(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("host-{i}:11434")).collect()
}

proptest! {
    /// The pool always has exactly as many instances as were configured.
    #[test]
    fn pool_size_matches_configured_instances(count in 1usize..32) {
        let pool = BackendPool::new(&instance_specs(count), Duration::from_secs(30));
        prop_assert_eq!(pool.instances().len(), count);
    }

    /// With every instance marked unhealthy, `pick` always reports
    /// unavailable, never a stale or partially-healthy result.
    #[test]
    fn pick_fails_once_every_instance_is_unhealthy(count in 1usize..32) {
        let pool = BackendPool::new(&instance_specs(count), Duration::from_secs(30));
        for backend in pool.instances() {
            backend.mark_failed();
        }
        prop_assert!(pool.pick(BackendSpecialization::Chat).is_err());
    }

    /// As long as at least one instance survives, `pick` returns a
    /// healthy backend regardless of which ones were marked down.
    #[test]
    fn pick_returns_a_healthy_backend_when_one_survives(
        count in 2usize..32,
        failed_fraction in 0usize..100,
    ) {
        let pool = BackendPool::new(&instance_specs(count), Duration::from_secs(30));
        let fail_count = (count - 1).min(failed_fraction % count);
        for backend in pool.instances().iter().take(fail_count) {
            backend.mark_failed();
        }
        let picked = pool.pick(BackendSpecialization::Chat).unwrap();
        prop_assert!(picked.is_healthy());
    }
}
