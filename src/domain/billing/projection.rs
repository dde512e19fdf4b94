//! Subscription status projection.

use crate::domain::foundation::{PaymentId, SubscriptionId, Timestamp};
use serde::Serialize;

use super::{Payment, PaymentMethod, PaymentStatus, Subscription, SubscriptionStatus};

/// Externally visible view of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionView {
    pub subscription_id: SubscriptionId,
    pub status: SubscriptionStatus,
    pub started_at: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub has_access: bool,
    pub latest_payment: Option<PaymentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub payment_id: PaymentId,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub updated_at: Timestamp,
}

impl From<&Payment> for PaymentSummary {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            method: payment.method,
            status: payment.status.clone(),
            updated_at: payment.updated_at,
        }
    }
}

/// Projects stored state into the read view. Pure, no I/O.
pub fn project(subscription: &Subscription, latest_payment: Option<&Payment>) -> SubscriptionView {
    SubscriptionView {
        subscription_id: subscription.id,
        status: subscription.status,
        started_at: subscription.started_at,
        current_period_end: subscription.current_period_end,
        has_access: subscription.status.has_access(),
        latest_payment: latest_payment.map(PaymentSummary::from),
    }
}
