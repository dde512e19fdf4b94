//! Plan as seen by checkout.
//!
//! The plan catalog itself is owned elsewhere; billing only needs price,
//! billing period, and whether the plan is still offered.

use crate::domain::foundation::PlanId;
use serde::{Deserialize, Serialize};

use super::BillingError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,

    /// Price per billing period, in cents.
    pub price_cents: i64,

    /// Length of one paid period in days.
    pub billing_period_days: u32,

    pub active: bool,
}

impl Plan {
    /// Fails with `PlanInactive` if the plan is no longer offered.
    pub fn ensure_purchasable(&self) -> Result<(), BillingError> {
        if !self.active {
            return Err(BillingError::PlanInactive(self.id));
        }
        Ok(())
    }
}
