//! In-Memory Plan Catalog Adapter
//!
//! Serves a fixed set of plans. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, PlanId};
use crate::ports::PlanCatalog;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPlanCatalog {
    plans: Arc<RwLock<HashMap<PlanId, Plan>>>,
}

impl InMemoryPlanCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-loaded with plans
    pub fn with_plans(plans: impl IntoIterator<Item = Plan>) -> Self {
        let plans = plans.into_iter().map(|p| (p.id, p)).collect();
        Self {
            plans: Arc::new(RwLock::new(plans)),
        }
    }

    /// Add or replace a plan
    pub async fn upsert(&self, plan: Plan) {
        self.plans.write().await.insert(plan.id, plan);
    }
}

#[async_trait]
impl PlanCatalog for InMemoryPlanCatalog {
    async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        Ok(self.plans.read().await.get(id).cloned())
    }
}
