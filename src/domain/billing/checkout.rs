//! Checkout settlement.
//!
//! A checkout is prepared against a subscription snapshot read before the
//! provider call, but the reconciler may commit in the meantime. Storage
//! adapters therefore settle the checkout against the row as it is at commit
//! time, while holding it.

use crate::domain::foundation::DomainError;

use super::{Payment, Subscription, SubscriptionStatus, TransitionPolicy};

/// How the subscription row is written when a checkout commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionWrite {
    /// No row existed; insert it.
    Insert,

    /// The stored row gains the activation from this checkout's payment.
    Update,

    /// The stored row stays as it is.
    Keep,
}

/// Subscription as it will be committed, plus how to write it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettlement {
    pub subscription: Subscription,
    pub write: SubscriptionWrite,
}

/// Settles a checkout against the stored subscription row.
///
/// `stored` is the row with `candidate.id` as currently committed. Status
/// fields of an existing row are never taken from `candidate`; the only change
/// a checkout makes to one is the activation implied by a payment the
/// provider returned already in the paid set.
///
/// # Errors
///
/// Returns error if the subscription refuses the activation.
pub fn settle_checkout(
    stored: Option<&Subscription>,
    candidate: &Subscription,
    payment: &Payment,
) -> Result<CheckoutSettlement, DomainError> {
    let activates =
        TransitionPolicy::subscription_target(&payment.status) == Some(SubscriptionStatus::Active);

    let Some(stored) = stored else {
        let mut subscription = candidate.clone();
        if activates {
            subscription.activate(payment.created_at)?;
        }
        return Ok(CheckoutSettlement {
            subscription,
            write: SubscriptionWrite::Insert,
        });
    };

    if activates && stored.status != SubscriptionStatus::Active {
        let mut subscription = stored.clone();
        subscription.activate(payment.created_at)?;
        return Ok(CheckoutSettlement {
            subscription,
            write: SubscriptionWrite::Update,
        });
    }

    Ok(CheckoutSettlement {
        subscription: stored.clone(),
        write: SubscriptionWrite::Keep,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{PaymentArtifacts, PaymentMethod, PaymentStatus, Plan};
    use crate::domain::foundation::{PaymentId, PlanId, SubscriptionId, Timestamp, UserId};

    fn pending(now: Timestamp) -> Subscription {
        let plan = Plan {
            id: PlanId::new(),
            name: "Sócio".to_string(),
            price_cents: 1990,
            billing_period_days: 30,
            active: true,
        };
        Subscription::create_pending(
            SubscriptionId::new(),
            UserId::new("user-1").unwrap(),
            &plan,
            None,
            now,
        )
    }

    fn charge(sub: &Subscription, status: &str, now: Timestamp) -> Payment {
        Payment::record_charge(
            PaymentId::new(),
            Some(sub.id),
            sub.user_id.clone(),
            PaymentMethod::Card,
            "mock",
            "tx_9",
            PaymentStatus::new(status),
            1990,
            PaymentArtifacts::default(),
            now,
        )
    }

    #[test]
    fn new_subscription_is_inserted_pending() {
        let now = Timestamp::now();
        let sub = pending(now);

        let settled = settle_checkout(None, &sub, &charge(&sub, "waiting_payment", now)).unwrap();

        assert_eq!(settled.write, SubscriptionWrite::Insert);
        assert_eq!(settled.subscription.status, SubscriptionStatus::Pending);
    }

    #[test]
    fn new_subscription_paid_at_checkout_is_inserted_active() {
        let now = Timestamp::now();
        let sub = pending(now);

        let settled = settle_checkout(None, &sub, &charge(&sub, "paid", now)).unwrap();

        assert_eq!(settled.write, SubscriptionWrite::Insert);
        assert_eq!(settled.subscription.status, SubscriptionStatus::Active);
        assert_eq!(settled.subscription.current_period_end, Some(now.add_days(30)));
    }

    #[test]
    fn stored_activation_survives_a_stale_pending_snapshot() {
        let now = Timestamp::now();
        let snapshot = pending(now);
        let mut stored = snapshot.clone();
        stored.activate(now).unwrap();

        let settled =
            settle_checkout(Some(&stored), &snapshot, &charge(&snapshot, "pending", now)).unwrap();

        assert_eq!(settled.write, SubscriptionWrite::Keep);
        assert_eq!(settled.subscription, stored);
    }

    #[test]
    fn paid_checkout_activates_the_stored_row() {
        let now = Timestamp::now();
        let stored = pending(now);
        let later = now.add_days(1);

        let settled = settle_checkout(Some(&stored), &stored, &charge(&stored, "paid", later)).unwrap();

        assert_eq!(settled.write, SubscriptionWrite::Update);
        assert_eq!(settled.subscription.status, SubscriptionStatus::Active);
        assert_eq!(settled.subscription.created_at, stored.created_at);
    }

    #[test]
    fn paid_checkout_on_active_row_keeps_period() {
        let now = Timestamp::now();
        let mut stored = pending(now);
        stored.activate(now).unwrap();

        let settled = settle_checkout(
            Some(&stored),
            &stored,
            &charge(&stored, "paid", now.add_days(3)),
        )
        .unwrap();

        assert_eq!(settled.write, SubscriptionWrite::Keep);
        assert_eq!(settled.subscription.current_period_end, stored.current_period_end);
    }
}
