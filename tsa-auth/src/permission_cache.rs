//! Permission cache: a short TTL, invalidated whenever a user's grants
//! change.
//!
//! Keyed by user rather than role: effective permissions are the union of
//! a user's primary role and any secondary roles in `user_roles`, so two
//! users sharing a role can have different effective grants. Avoids a
//! `role_permissions`/`user_roles` join on every authorized request; a
//! cache miss or an explicit `invalidate` falls back to `RbacStore`.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tsa_core::domain::Permission;
use tsa_core::ids::UserId;

struct Entry {
    permissions: Vec<Permission>,
    cached_at: Instant,
}

pub struct PermissionCache {
    entries: DashMap<UserId, Entry>,
    ttl: Duration,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn default_ttl() -> Self {
        Self::new(Duration::from_secs(5 * 60))
    }

    pub fn get(&self, user_id: UserId) -> Option<Vec<Permission>> {
        let entry = self.entries.get(&user_id)?;
        if entry.cached_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.permissions.clone())
    }

    pub fn put(&self, user_id: UserId, permissions: Vec<Permission>) {
        self.entries.insert(user_id, Entry { permissions, cached_at: Instant::now() });
    }

    /// Called whenever a user's effective permissions change (role switch,
    /// grant/revoke of a secondary role), so stale grants are never served
    /// past a mutation.
    pub fn invalidate(&self, user_id: UserId) {
        self.entries.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(name: &str) -> Permission {
        Permission::new("documents", name)
    }

    #[test]
    fn miss_on_empty_cache() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        assert!(cache.get(UserId(1)).is_none());
    }

    #[test]
    fn hit_after_put() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        cache.put(UserId(1), vec![perm("download")]);
        assert_eq!(cache.get(UserId(1)).unwrap().len(), 1);
    }

    #[test]
    fn invalidate_clears_entry() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        cache.put(UserId(1), vec![perm("download")]);
        cache.invalidate(UserId(1));
        assert!(cache.get(UserId(1)).is_none());
    }

    #[test]
    fn expired_entry_is_treated_as_a_miss() {
        let cache = PermissionCache::new(Duration::from_millis(1));
        cache.put(UserId(1), vec![perm("download")]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(UserId(1)).is_none());
    }
}
