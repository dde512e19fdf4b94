//! Plan catalog port.
//!
//! The catalog is owned by another service; checkout only reads from it.

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, PlanId};
use async_trait::async_trait;

#[async_trait]
pub trait PlanCatalog: Send + Sync {
    /// Find a plan by ID, active or not.
    ///
    /// Returns `None` if the plan does not exist.
    async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError>;
}
