//! `UserStatus` transition table.
//!
//! The "active ⇄ locked" distinction is not a `UserStatus` transition
//! at all — it is the separate `locked_until` timestamp on `User`
//! (see `tsa_core::domain::User::is_locked`), set by
//! `RbacStore::record_failed_login` and cleared by
//! `record_successful_login`. This table governs the coarser status
//! field: `pending_verification → active`, `active ⇄ suspended`, and
//! `* → inactive`.

use tsa_core::domain::UserStatus;

pub fn is_allowed(from: UserStatus, to: UserStatus) -> bool {
    use UserStatus::*;
    match (from, to) {
        (PendingVerification, Active) => true,
        (Active, Suspended) => true,
        (Suspended, Active) => true,
        (_, Inactive) => true,
        (same_a, same_b) if same_a == same_b => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use UserStatus::*;

    #[test]
    fn pending_verification_moves_to_active() {
        assert!(is_allowed(PendingVerification, Active));
    }

    #[test]
    fn active_and_suspended_are_mutually_reachable() {
        assert!(is_allowed(Active, Suspended));
        assert!(is_allowed(Suspended, Active));
    }

    #[test]
    fn any_state_can_move_to_inactive() {
        for from in [Active, Suspended, PendingVerification, Inactive] {
            assert!(is_allowed(from, Inactive));
        }
    }

    #[test]
    fn pending_verification_cannot_skip_straight_to_suspended() {
        assert!(!is_allowed(PendingVerification, Suspended));
    }

    #[test]
    fn inactive_is_terminal() {
        assert!(!is_allowed(Inactive, Active));
        assert!(!is_allowed(Inactive, Suspended));
    }
}
