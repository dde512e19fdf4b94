//! Subscription status state machine.
//!
//! Subscriptions are created PENDING at checkout and only ever move between
//! lifecycle states; they are never deleted.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Externally visible subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Created at checkout, awaiting a confirming payment.
    Pending,

    /// A payment in the paid set has been observed.
    Active,

    /// Payment overdue. Access is kept while the user settles.
    PastDue,

    /// Cancelled through the manual cancellation path.
    Canceled,
}

impl SubscriptionStatus {
    /// Returns true if this status grants access to member features.
    pub fn has_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::PastDue)
    }

    /// Returns true if a user holding this status may not start another checkout.
    pub fn blocks_new_checkout(&self) -> bool {
        self.has_access()
    }

    /// Returns true while the subscription counts against the one-per-user
    /// limit. Only CANCELED frees the slot.
    pub fn is_open(&self) -> bool {
        !matches!(self, SubscriptionStatus::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "PENDING",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::PastDue => "PAST_DUE",
            SubscriptionStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SubscriptionStatus::Pending),
            "ACTIVE" => Ok(SubscriptionStatus::Active),
            "PAST_DUE" => Ok(SubscriptionStatus::PastDue),
            "CANCELED" => Ok(SubscriptionStatus::Canceled),
            other => Err(format!("unknown subscription status: {}", other)),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Active)
                | (Pending, Canceled)
            // From ACTIVE
                | (Active, Active) // Renewal payment
                | (Active, PastDue)
                | (Active, Canceled)
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Canceled)
            // From CANCELED
                | (Canceled, Active) // Late confirming payment
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Canceled],
            Active => vec![Active, PastDue, Canceled],
            PastDue => vec![Active, Canceled],
            Canceled => vec![Active],
        }
    }
}
