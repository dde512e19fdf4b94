//! Subscription aggregate.
//!
//! A user holds at most one subscription with access at a time; checkout
//! enforces that, the reconciler only moves status and period fields.

use crate::domain::foundation::{
    CategoryId, DomainError, ErrorCode, PlanId, StateMachine, SubscriptionId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use super::{Plan, SubscriptionStatus};

/// Subscription aggregate.
///
/// # Invariants
///
/// - Created PENDING, never deleted
/// - `started_at` is set once, on first activation
/// - `current_period_end` is only moved when a payment enters the paid set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub category_id: Option<CategoryId>,
    pub status: SubscriptionStatus,

    /// Period length copied from the plan at checkout.
    pub billing_period_days: u32,

    pub started_at: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a subscription awaiting its first confirming payment.
    pub fn create_pending(
        id: SubscriptionId,
        user_id: UserId,
        plan: &Plan,
        category_id: Option<CategoryId>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            plan_id: plan.id,
            category_id,
            status: SubscriptionStatus::Pending,
            billing_period_days: plan.billing_period_days,
            started_at: None,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Activates after a payment entered the paid set.
    ///
    /// Starts a fresh billing period at `now`.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn activate(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.current_period_end = Some(now.add_days(i64::from(self.billing_period_days)));
        self.updated_at = now;
        Ok(())
    }

    /// Moves back to ACTIVE without touching the billing period.
    ///
    /// Used when a payment moves within the paid set (authorized to paid)
    /// while the subscription left ACTIVE in between.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn reinstate(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {:?} to {:?} (allowed: {:?})",
                    self.status,
                    target,
                    self.status.valid_transitions()
                ),
            )
            .with_detail("subscription_id", self.id.to_string())
        })?;
        Ok(())
    }
}
