//! Payment status to subscription status policy.
//!
//! Two tables drive reconciliation: which payment statuses move a
//! subscription, and how far along its lifecycle each payment status is.

use super::{PaymentStatus, SubscriptionStatus};

/// Payment statuses that drive a subscription transition.
///
/// Cancellation, refund, and past-due are handled manually and do not
/// appear here.
pub const SUBSCRIPTION_TRANSITIONS: &[(&str, SubscriptionStatus)] = &[
    (PaymentStatus::PAID, SubscriptionStatus::Active),
    (PaymentStatus::AUTHORIZED, SubscriptionStatus::Active),
];

/// Lifecycle rank of known payment statuses. Unlisted statuses rank 0.
pub const STATUS_RANKS: &[(&str, u8)] = &[
    ("pending", 0),
    ("processing", 0),
    ("waiting_payment", 0),
    ("authorized", 1),
    ("paid", 2),
    ("refused", 2),
    ("canceled", 2),
    ("failed", 2),
    ("refunded", 3),
    ("chargedback", 3),
];

/// Decides whether an incoming status may overwrite the stored one and
/// what it does to the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPolicy {
    /// Reject statuses that rank below the stored one.
    pub monotonic: bool,
}

impl TransitionPolicy {
    pub fn new(monotonic: bool) -> Self {
        Self { monotonic }
    }

    /// Unconditional last-write-wins.
    pub fn last_write_wins() -> Self {
        Self { monotonic: false }
    }

    pub fn rank(status: &PaymentStatus) -> u8 {
        STATUS_RANKS
            .iter()
            .find(|(name, _)| *name == status.as_str())
            .map(|(_, rank)| *rank)
            .unwrap_or(0)
    }

    /// Subscription status the payment status demands, if any.
    pub fn subscription_target(status: &PaymentStatus) -> Option<SubscriptionStatus> {
        SUBSCRIPTION_TRANSITIONS
            .iter()
            .find(|(name, _)| *name == status.as_str())
            .map(|(_, target)| *target)
    }

    /// Returns true if `incoming` may replace `current`.
    ///
    /// Equal ranks overwrite.
    pub fn admits(&self, current: &PaymentStatus, incoming: &PaymentStatus) -> bool {
        !self.monotonic || Self::rank(incoming) >= Self::rank(current)
    }
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self { monotonic: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(s: &str) -> PaymentStatus {
        PaymentStatus::new(s)
    }

    #[test]
    fn only_paid_set_drives_subscription() {
        assert_eq!(
            TransitionPolicy::subscription_target(&status("paid")),
            Some(SubscriptionStatus::Active)
        );
        assert_eq!(
            TransitionPolicy::subscription_target(&status("authorized")),
            Some(SubscriptionStatus::Active)
        );
        assert_eq!(TransitionPolicy::subscription_target(&status("refused")), None);
        assert_eq!(TransitionPolicy::subscription_target(&status("refunded")), None);
        assert_eq!(TransitionPolicy::subscription_target(&status("canceled")), None);
    }

    #[test]
    fn transition_table_matches_paid_set() {
        for (name, _) in SUBSCRIPTION_TRANSITIONS {
            assert!(status(name).is_paid());
        }
    }

    #[test]
    fn unknown_statuses_rank_lowest() {
        assert_eq!(TransitionPolicy::rank(&status("something_new")), 0);
    }

    #[test]
    fn monotonic_policy_rejects_regression() {
        let policy = TransitionPolicy::new(true);
        assert!(!policy.admits(&status("paid"), &status("pending")));
        assert!(!policy.admits(&status("authorized"), &status("waiting_payment")));
        assert!(!policy.admits(&status("refunded"), &status("paid")));
    }

    #[test]
    fn monotonic_policy_allows_forward_and_equal_rank() {
        let policy = TransitionPolicy::new(true);
        assert!(policy.admits(&status("pending"), &status("authorized")));
        assert!(policy.admits(&status("authorized"), &status("paid")));
        assert!(policy.admits(&status("paid"), &status("refunded")));
        assert!(policy.admits(&status("paid"), &status("refused")));
    }

    #[test]
    fn last_write_wins_admits_everything() {
        let policy = TransitionPolicy::last_write_wins();
        assert!(policy.admits(&status("paid"), &status("pending")));
    }

    #[test]
    fn default_is_monotonic() {
        assert!(TransitionPolicy::default().monotonic);
    }
}
