//! Reconciliation planning.
//!
//! Given the locked payment row, its subscription, and an incoming provider
//! status, decide what to write. Storage adapters run this inside the same
//! transaction that holds the row locks, so the decision and the write are
//! one atomic unit.

use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp};

use super::{Payment, PaymentStatus, Subscription, SubscriptionStatus, TransitionPolicy};

/// What reconciling one notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The payment status was overwritten.
    Applied {
        previous: PaymentStatus,
        new: PaymentStatus,
        /// Set when the linked subscription was moved to ACTIVE.
        subscription_activated: Option<SubscriptionId>,
    },

    /// The stored status already equals the incoming one.
    ///
    /// A paid-set redelivery still brings a linked subscription that is out
    /// of step back to ACTIVE.
    Duplicate {
        status: PaymentStatus,
        subscription_activated: Option<SubscriptionId>,
    },

    /// The incoming status ranks below the stored one.
    StaleIgnored {
        current: PaymentStatus,
        incoming: PaymentStatus,
    },

    /// No local payment carries this provider id.
    UnknownReference,
}

impl ReconcileOutcome {
    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied { .. } => "applied",
            ReconcileOutcome::Duplicate { .. } => "duplicate",
            ReconcileOutcome::StaleIgnored { .. } => "stale_ignored",
            ReconcileOutcome::UnknownReference => "unknown_reference",
        }
    }
}

/// Rows to write plus the outcome to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Updated payment, if it changed.
    pub payment: Option<Payment>,

    /// Updated subscription, if it changed.
    pub subscription: Option<Subscription>,

    pub outcome: ReconcileOutcome,
}

impl ReconciliationPlan {
    fn unchanged(outcome: ReconcileOutcome) -> Self {
        Self {
            payment: None,
            subscription: None,
            outcome,
        }
    }
}

/// Plans the writes for one notification.
///
/// `subscription` must be the row referenced by `payment.subscription_id`,
/// when there is one.
///
/// # Errors
///
/// Returns error if the subscription refuses the transition.
pub fn plan_reconciliation(
    payment: Option<&Payment>,
    subscription: Option<&Subscription>,
    incoming: &PaymentStatus,
    policy: &TransitionPolicy,
    now: Timestamp,
) -> Result<ReconciliationPlan, DomainError> {
    let Some(payment) = payment else {
        return Ok(ReconciliationPlan::unchanged(
            ReconcileOutcome::UnknownReference,
        ));
    };

    let linked = subscription.filter(|sub| Some(sub.id) == payment.subscription_id);
    let activates =
        TransitionPolicy::subscription_target(incoming) == Some(SubscriptionStatus::Active);

    if payment.status == *incoming {
        let healed = match linked {
            Some(sub) if activates && sub.status != SubscriptionStatus::Active => {
                bring_to_active(sub, true, now)?
            }
            _ => None,
        };
        return Ok(ReconciliationPlan {
            payment: None,
            outcome: ReconcileOutcome::Duplicate {
                status: incoming.clone(),
                subscription_activated: healed.as_ref().map(|sub| sub.id),
            },
            subscription: healed,
        });
    }

    if !policy.admits(&payment.status, incoming) {
        return Ok(ReconciliationPlan::unchanged(
            ReconcileOutcome::StaleIgnored {
                current: payment.status.clone(),
                incoming: incoming.clone(),
            },
        ));
    }

    let previous = payment.status.clone();
    let mut updated_payment = payment.clone();
    updated_payment.apply_status(incoming.clone(), now);

    let updated_subscription = match linked {
        Some(sub) if activates => bring_to_active(sub, previous.is_paid(), now)?,
        _ => None,
    };

    Ok(ReconciliationPlan {
        outcome: ReconcileOutcome::Applied {
            previous,
            new: incoming.clone(),
            subscription_activated: updated_subscription.as_ref().map(|sub| sub.id),
        },
        payment: Some(updated_payment),
        subscription: updated_subscription,
    })
}

/// Moves a subscription to ACTIVE for a payment now in the paid set.
///
/// Entering the paid set starts a billing period. Staying inside it only
/// restores the status, unless the subscription never had a period.
fn bring_to_active(
    sub: &Subscription,
    was_paid: bool,
    now: Timestamp,
) -> Result<Option<Subscription>, DomainError> {
    let mut sub = sub.clone();
    if !was_paid || sub.current_period_end.is_none() {
        sub.activate(now)?;
    } else if sub.status != SubscriptionStatus::Active {
        sub.reinstate(now)?;
    } else {
        return Ok(None);
    }
    Ok(Some(sub))
}
